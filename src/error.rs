/// All errors that may occur during initialization or while handling requests.
#[derive(Debug, thiserror::Error)]
pub enum Error
{
	#[error("could not read config file")]
	ReadConfigFile(#[source] std::io::Error),
	#[error("could not parse config file")]
	ParseConfigFile(#[source] serde_yaml::Error),

	#[error("could not create HTTP client")]
	CreateHttpClient(#[source] reqwest::Error),

	#[error("could not parse URL")]
	ParseUrl(#[source] url::ParseError),
	#[error("could not make GitLab API request")]
	MakeGitLabApiRequest(#[source] reqwest::Error),
	#[error("received GitLab API client error (status code {status_code}) for {url}: \
		{response_body}")]
	ReceivedGitLabApiClientError
	{
		status_code: reqwest::StatusCode,
		url: url::Url,
		response_body: String,
	},
	#[error("could not decode GitLab API response body")]
	DecodeGitLabApiResponseBody(#[source] serde_json::Error),

	#[error("could not send Slack notification")]
	MakeSlackRequest(#[source] reqwest::Error),

	#[error("payload of {size} bytes exceeds the limit of {limit} bytes")]
	PayloadTooLarge
	{
		size: usize,
		limit: usize,
	},
	#[error("could not decode payload body")]
	DecodePayloadBody(#[source] serde_json::Error),
	#[error("not a merge request event (object kind “{0}”)")]
	UnexpectedEventKind(String),
	#[error("merge request event without object attributes")]
	MissingObjectAttributes,
}

impl Error
{
	/// A short, stable label for this kind of error, used to tag log records.
	pub fn kind(&self) -> &'static str
	{
		match self
		{
			Self::ReadConfigFile(_) => "read_config_file",
			Self::ParseConfigFile(_) => "parse_config_file",
			Self::CreateHttpClient(_) => "create_http_client",
			Self::ParseUrl(_) => "parse_url",
			Self::MakeGitLabApiRequest(_) => "gitlab_request",
			Self::ReceivedGitLabApiClientError{..} => "gitlab_client_error",
			Self::DecodeGitLabApiResponseBody(_) => "gitlab_response_body",
			Self::MakeSlackRequest(_) => "slack_request",
			Self::PayloadTooLarge{..} => "payload_too_large",
			Self::DecodePayloadBody(_) => "payload_body",
			Self::UnexpectedEventKind(_) => "unexpected_event_kind",
			Self::MissingObjectAttributes => "missing_object_attributes",
		}
	}

	/// Log this error along with its full chain of causes, tagged with its kind.
	///
	/// # Arguments
	/// - `context`: Human-readable description of what failed.
	pub fn log(self, context: &str)
	{
		let kind = self.kind();

		log::error!("[{kind}] {context}");
		log::error!("[{kind}] {:?}", anyhow::Error::from(self));
	}
}
