#[derive(Debug, serde::Deserialize, serde::Serialize)]
#[serde(default)]
/// Top-level configuration of this application.
///
/// Apart from the port, all options default to empty values if omitted. Requests relying on them
/// will then fail at runtime and be logged.
pub struct Config
{
	/// Port to listen on for incoming requests (optional, default: 8080).
	pub port: u16,
	/// Configuration options specific to the Slack incoming webhook.
	pub slack: crate::slack::Config,
	/// Configuration options specific to the GitLab API and authentication.
	pub gitlab: crate::gitlab_api::Config,
	/// The project summarized by the merge request list command.
	pub summary: SummaryConfig,
}

/// Identifies the project whose open merge requests are listed on demand.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SummaryConfig
{
	/// ID (or URL-encoded path) of the project as used in GitLab API calls.
	pub project_id: String,
	/// Namespace segment used when building merge request URLs.
	pub namespace: String,
	/// Project name segment used when building merge request URLs.
	pub name: String,
}

impl Default for SummaryConfig
{
	fn default() -> Self
	{
		Self
		{
			project_id: "208".to_owned(),
			namespace: "p".to_owned(),
			name: "higgs".to_owned(),
		}
	}
}

impl Default for Config
{
	fn default() -> Self
	{
		Self
		{
			port: 8080,
			slack: Default::default(),
			gitlab: Default::default(),
			summary: Default::default(),
		}
	}
}

impl Config
{
	/// Attempt to read and parse the configuration from a YAML file.
	///
	/// # Arguments
	/// `path`: Path to the configuration file in YAML format.
	pub fn from_file<P>(path: P) -> Result<Self, crate::Error>
	where
		P: AsRef<std::path::Path>
	{
		let file = std::fs::File::open(&path).map_err(crate::Error::ReadConfigFile)?;
		serde_yaml::from_reader(&file).map_err(crate::Error::ParseConfigFile)
	}

	/// Parse the configuration from a YAML string.
	pub fn from_yaml(yaml: &str) -> Result<Self, crate::Error>
	{
		serde_yaml::from_str(yaml).map_err(crate::Error::ParseConfigFile)
	}
}
