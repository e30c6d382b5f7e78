/// Configuration of the Slack incoming webhook.
#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config
{
	/// URL of the incoming webhook to post notifications to.
	pub incoming_webhook: String,
	/// Name to post summaries of open merge requests as. Event notifications are posted under the
	/// name of the user involved instead.
	pub username: String,
	/// Emoji shown as the avatar of posted notifications (example: `:fox_face:`).
	pub icon_emoji: String,
	/// Channel to post notifications to (example: `#merge-requests`).
	pub channel: String,
}

/// A message to be posted to Slack.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification
{
	/// The message text in Slack’s markup format.
	pub text: String,
	/// Name the message is posted as.
	pub username: String,
}

/// Request body accepted by Slack incoming webhooks.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct IncomingWebhookRequest<'a>
{
	text: &'a str,
	username: &'a str,
	icon_emoji: &'a str,
	channel: &'a str,
}

/// Client posting notifications to a Slack incoming webhook.
#[derive(Clone)]
pub struct Client
{
	#[doc(hidden)]
	config: std::sync::Arc<crate::Config>,
	#[doc(hidden)]
	reqwest_client: reqwest::Client,
}

impl Client
{
	/// Initialize a new Slack client posting according to the given configuration.
	pub fn from_config(config: std::sync::Arc<crate::Config>) -> Result<Self, crate::Error>
	{
		let reqwest_client = reqwest::ClientBuilder::new()
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build().map_err(crate::Error::CreateHttpClient)?;

		Ok(Self
		{
			config,
			reqwest_client,
		})
	}

	/// Post a notification and wait for Slack to accept it. Failed notifications aren’t retried.
	pub async fn send(&self, notification: &Notification) -> Result<(), crate::Error>
	{
		let slack_config = &self.config.slack;

		let request_body = IncomingWebhookRequest
		{
			text: &notification.text,
			username: &notification.username,
			icon_emoji: &slack_config.icon_emoji,
			channel: &slack_config.channel,
		};

		log::info!("posting Slack notification as “{}”", notification.username);

		self.reqwest_client.post(&slack_config.incoming_webhook)
			.json(&request_body)
			.send().await.map_err(crate::Error::MakeSlackRequest)?
			.error_for_status().map_err(crate::Error::MakeSlackRequest)?;

		log::info!("posted Slack notification: {}", notification.text);

		Ok(())
	}

	/// Post a notification in a separate task without waiting for the result. Failures are only
	/// logged.
	pub fn dispatch(&self, notification: Notification)
	{
		let client = self.clone();

		tokio::spawn(
			async move
			{
				if let Err(error) = client.send(&notification).await
				{
					error.log(&format!("could not post Slack notification “{}”", notification.text));
				}
			});
	}
}
