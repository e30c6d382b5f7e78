/// Configuration of the GitLab API client.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config
{
	/// The base URL of the GitLab server without trailing slash (example:
	/// `https://gitlab.example.com`). Also used to build links to merge requests.
	pub host: String,
	/// The path of the REST API on the GitLab server (example: `/api/v4`).
	pub api_path: String,
	/// Personal access token used to authenticate API requests.
	pub token: String,
}

/// A GitLab API client authenticating with a personal access token.
///
/// Requests are neither retried nor timed out. The client can safely be shared between tasks, as it
/// only holds thread-safe handles to the underlying data structures.
#[derive(Clone)]
pub struct Client
{
	#[doc(hidden)]
	config: std::sync::Arc<Config>,
	#[doc(hidden)]
	reqwest_client: reqwest::Client,
}

impl Client
{
	/// Initialize a new GitLab API client with a given configuration.
	pub fn from_config(config: std::sync::Arc<Config>) -> Result<Self, crate::Error>
	{
		let reqwest_client = reqwest::ClientBuilder::new()
			// Set a recognizable user agent to get meaningful debugging information on the server
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build().map_err(crate::Error::CreateHttpClient)?;

		Ok(Self
		{
			config,
			reqwest_client,
		})
	}

	/// List the users known to the GitLab server, one page at a time.
	///
	/// # Arguments
	/// - `page`: The page to retrieve, starting at 1.
	/// - `per_page`: The maximum number of users per page.
	pub async fn list_users(&self, page: u32, per_page: u32)
		-> Result<Vec<crate::User>, crate::Error>
	{
		self.get("users", &[("page", page.to_string()), ("per_page", per_page.to_string())]).await
	}

	/// List the merge requests of a project, one page at a time.
	///
	/// # Arguments
	/// - `project_id`: The ID (or URL-encoded path) of the project.
	/// - `page`: The page to retrieve, starting at 1.
	/// - `per_page`: The maximum number of merge requests per page.
	/// - `state`: Only list merge requests in this state (example: `opened`).
	pub async fn list_project_merge_requests(
		&self,
		project_id: &str,
		page: u32,
		per_page: u32,
		state: &str)
		-> Result<Vec<crate::MergeRequest>, crate::Error>
	{
		self.get(
			format!("projects/{project_id}/merge_requests"),
			&[
				("page", page.to_string()),
				("per_page", per_page.to_string()),
				("state", state.to_owned()),
			]).await
	}

	/// Make an HTTP GET request to the GitLab API.
	///
	/// # Arguments
	/// - `endpoint`: The API endpoint (relative to the API path, without leading slash, example:
	///   `users`).
	/// - `query`: Query parameters to append to the URL.
	pub async fn get<S, R>(&self, endpoint: S, query: &[(&str, String)]) -> Result<R, crate::Error>
	where
		S: AsRef<str>,
		R: serde::de::DeserializeOwned,
	{
		let url = self.endpoint_url(endpoint.as_ref())?;

		log::debug!("requesting {url}");

		let response = self.reqwest_client.get(url)
			.query(query)
			// Provide the access token using GitLab’s private token header
			.header("PRIVATE-TOKEN", &self.config.token)
			.header(reqwest::header::ACCEPT, "application/json")
			.send().await.map_err(crate::Error::MakeGitLabApiRequest)?;

		// Return an error if there was a client error according to the response’s HTTP status
		if response.status().is_client_error()
		{
			let status_code = response.status();
			let url = response.url().to_owned();

			// Decode the body for debugging purposes
			let response_body =
				response.text().await.map_err(crate::Error::MakeGitLabApiRequest)?;

			return Err(crate::Error::ReceivedGitLabApiClientError{status_code, url, response_body});
		}

		let response_body = response
			// Return an error if there was a server error according to the response’s HTTP status
			.error_for_status().map_err(crate::Error::MakeGitLabApiRequest)?
			// Read the full response if there was no server error
			.bytes().await.map_err(crate::Error::MakeGitLabApiRequest)?;

		serde_json::from_slice(&response_body).map_err(crate::Error::DecodeGitLabApiResponseBody)
	}

	/// Build the full URL of an API endpoint from the configured host and API path.
	#[doc(hidden)]
	fn endpoint_url(&self, endpoint: &str) -> Result<url::Url, crate::Error>
	{
		// The base URL needs a trailing slash, or else joining would replace its last segment
		let base_url = format!("{}{}/",
			self.config.host.trim_end_matches('/'),
			self.config.api_path.trim_end_matches('/'));

		url::Url::parse(&base_url)
			.and_then(|base_url| base_url.join(endpoint))
			.map_err(crate::Error::ParseUrl)
	}
}
