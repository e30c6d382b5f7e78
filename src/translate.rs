//! Translation of GitLab events and API responses into Slack notifications.

use crate::slack::Notification;

/// Link used for merge request events that carry neither a URL nor a target project.
pub const PLACEHOLDER_MERGE_REQUEST_URL: &str = "http://gitlab/is/stupid/2.0";

/// Placeholder shown in summaries for merge requests without an assignee.
pub const UNASSIGNED: &str = "???";

/// Build the notification for a merge request event.
///
/// Returns an error, and nothing should be posted, if the payload isn’t a merge request event or
/// lacks the merge request’s attributes.
///
/// # Arguments
/// - `event`: The decoded webhook event payload.
/// - `users`: Directory used to display user IDs as usernames.
/// - `config`: The application configuration, used to build links to merge requests.
pub fn translate_merge_request_event(
	event: &crate::MergeRequestEvent,
	users: &crate::UserDirectory,
	config: &crate::Config)
	-> Result<Notification, crate::Error>
{
	if event.object_kind != "merge_request"
	{
		return Err(crate::Error::UnexpectedEventKind(event.object_kind.clone()));
	}

	let attributes = event.object_attributes.as_ref()
		.ok_or(crate::Error::MissingObjectAttributes)?;

	log::debug!("merge request !{} “{}” → “{}” ({}), action “{}”", attributes.iid,
		attributes.source_branch, attributes.target_branch, attributes.merge_status,
		attributes.action);

	let url = merge_request_url(attributes, &config.gitlab.host);

	let mut state = attributes.state.as_str();

	let author = match users.resolve(attributes.author_id)
	{
		Some(author) => author.to_owned(),
		None =>
		{
			log::info!("unknown author ID {}", attributes.author_id);
			attributes.author_id.to_string()
		},
	};
	let mut author_suffix = format!(" (_by {author}_)");
	let mut sender = author;

	match users.resolve(attributes.assignee_id)
	{
		// Without an assignee, the author isn’t mentioned either
		None =>
		{
			log::info!("unknown assignee ID {}", attributes.assignee_id);
			author_suffix.clear();
		},
		Some(assignee) =>
		{
			sender = assignee.to_owned();

			if state == "opened"
			{
				state = "assigned";
			}
		},
	}

	let description_suffix = match attributes.action == "open" && attributes.state != "merged"
	{
		true => format!(" {}", attributes.description),
		false => String::new(),
	};

	let text = format!("<{url}> *{}*{author_suffix} {state}{description_suffix}",
		attributes.source_branch);

	Ok(Notification{text, username: sender})
}

/// Determine the link to a merge request, synthesizing it from the target project if the event
/// doesn’t provide it.
#[doc(hidden)]
fn merge_request_url(attributes: &crate::MergeRequestAttributes, host: &str) -> String
{
	if !attributes.url.is_empty()
	{
		return attributes.url.clone();
	}

	match &attributes.target
	{
		Some(target) =>
		{
			log::debug!("merge request event without URL, building it from the target project");
			format!("{host}/{}/{}/merge_requests/{}", target.namespace, target.name, attributes.iid)
		},
		None =>
		{
			log::warn!("merge request event without URL and target project, using placeholder");
			PLACEHOLDER_MERGE_REQUEST_URL.to_owned()
		},
	}
}

/// Describe a push event for the logs. Push events aren’t posted to Slack.
pub fn describe_push_event(event: &crate::PushEvent) -> String
{
	match &event.repository
	{
		Some(repository) => format!("push to “{}” in repository “{}” <{}> (previously {})",
			event.ref_, repository.name, repository.homepage, event.before),
		None => format!("push to “{}” (previously {})", event.ref_, event.before),
	}
}

/// Build a notification listing merge requests, one per line, posted under the configured Slack
/// username.
///
/// Links are built from the configured summary project rather than from the merge requests
/// themselves.
pub fn summarize_merge_requests(merge_requests: &[crate::MergeRequest], config: &crate::Config)
	-> Notification
{
	let summary = &config.summary;

	let text = merge_requests.iter()
		.map(|merge_request|
		{
			let assignee = merge_request.assignee.as_ref()
				.map_or(UNASSIGNED, |assignee| assignee.username.as_str());

			let url = format!("{}/{}/{}/merge_requests/{}", config.gitlab.host, summary.namespace,
				summary.name, merge_request.iid);

			format!("MR <{url}> *{}* _assignee_:{assignee}\n", merge_request.source_branch)
		})
		.collect();

	Notification
	{
		text,
		username: config.slack.username.clone(),
	}
}
