/// Deserialize a field that GitLab may send as `null` into its default value.
#[doc(hidden)]
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: serde::Deserializer<'de>,
	T: Default + serde::Deserialize<'de>,
{
	use serde::Deserialize as _;

	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Partial user data model as returned in responses from the GitLab API.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User
{
	/// The numeric user ID.
	#[serde(default, deserialize_with = "null_as_default")]
	pub id: u64,
	/// The user’s handle.
	#[serde(default, deserialize_with = "null_as_default")]
	pub username: String,
	// We don’t need the other fields, so ignore them
}

/// Partial merge request data model as returned by the GitLab API when listing a project’s merge
/// requests.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MergeRequest
{
	/// The merge request’s ID within its project, as shown in URLs.
	#[serde(default, deserialize_with = "null_as_default")]
	pub iid: u64,
	/// The branch to be merged.
	#[serde(default, deserialize_with = "null_as_default")]
	pub source_branch: String,
	/// The user assigned to the merge request, if any.
	#[serde(default)]
	pub assignee: Option<User>,
	// We don’t need the other fields, so ignore them
}

/// Webhook event payload for merge request events as provided by the GitLab server.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MergeRequestEvent
{
	/// The kind of event (`merge_request` for merge request events).
	#[serde(default, deserialize_with = "null_as_default")]
	pub object_kind: String,
	/// The state of the merge request after this event.
	#[serde(default)]
	pub object_attributes: Option<MergeRequestAttributes>,
	// We don’t need the other fields, so ignore them
}

/// Attributes of the merge request a webhook event is reported for.
///
/// GitLab omits or nulls several of these fields depending on the action, so all of them fall back
/// to empty values.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MergeRequestAttributes
{
	/// What happened to the merge request (`open`, `update`, `merge`, …).
	#[serde(deserialize_with = "null_as_default")]
	pub action: String,
	#[serde(deserialize_with = "null_as_default")]
	pub author_id: u64,
	#[serde(deserialize_with = "null_as_default")]
	pub assignee_id: u64,
	#[serde(deserialize_with = "null_as_default")]
	pub description: String,
	/// The merge request’s ID within its project.
	#[serde(deserialize_with = "null_as_default")]
	pub iid: u64,
	#[serde(deserialize_with = "null_as_default")]
	pub merge_status: String,
	#[serde(deserialize_with = "null_as_default")]
	pub source_branch: String,
	#[serde(deserialize_with = "null_as_default")]
	pub target_branch: String,
	/// Lifecycle state (`opened`, `merged`, `closed`, …).
	#[serde(deserialize_with = "null_as_default")]
	pub state: String,
	/// The project the merge request targets.
	pub target: Option<Project>,
	/// Direct link to the merge request (frequently missing).
	#[serde(deserialize_with = "null_as_default")]
	pub url: String,
}

/// Partial project data model as embedded in webhook event payloads.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Project
{
	#[serde(deserialize_with = "null_as_default")]
	pub name: String,
	#[serde(deserialize_with = "null_as_default")]
	pub namespace: String,
}

/// Webhook event payload for push events as provided by the GitLab server.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PushEvent
{
	/// The commit the ref pointed to before the push.
	#[serde(deserialize_with = "null_as_default")]
	pub before: String,
	/// The pushed `git ref`.
	#[serde(rename = "ref", deserialize_with = "null_as_default")]
	pub ref_: String,
	pub repository: Option<Repository>,
	// We don’t need the other fields, so ignore them
}

/// Partial repository data model as embedded in push event payloads.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Repository
{
	#[serde(deserialize_with = "null_as_default")]
	pub name: String,
	#[serde(deserialize_with = "null_as_default")]
	pub homepage: String,
}
