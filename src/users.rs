/// Number of users requested when building the directory. Only a single page is ever fetched, so
/// users beyond it can’t be resolved.
pub const USER_PAGE_SIZE: u32 = 100;

/// Mapping from GitLab user IDs to usernames, built once at startup and read-only afterwards.
#[derive(Debug, Default)]
pub struct UserDirectory
{
	#[doc(hidden)]
	usernames: std::collections::HashMap<u64, String>,
}

impl UserDirectory
{
	/// Build the directory from the first page of users known to the GitLab server.
	///
	/// If the users can’t be listed, the error is logged and the directory stays empty, so that all
	/// user IDs are later displayed as is.
	pub async fn fetch(client: &crate::gitlab_api::Client) -> Self
	{
		log::info!("retrieving GitLab users");

		match client.list_users(1, USER_PAGE_SIZE).await
		{
			Ok(users) =>
			{
				let directory = Self::from_users(users);
				log::info!("retrieved {} GitLab users", directory.len());
				directory
			},
			Err(error) =>
			{
				error.log("no access to GitLab users, user IDs won’t be resolved");
				Self::default()
			},
		}
	}

	/// Build the directory from a list of users.
	pub fn from_users<I>(users: I) -> Self
	where
		I: IntoIterator<Item = crate::User>,
	{
		let usernames = users.into_iter()
			.inspect(|user| log::debug!("user {} is “{}”", user.id, user.username))
			.map(|user| (user.id, user.username))
			.collect();

		Self{usernames}
	}

	/// Look up the username for a user ID. Unknown IDs are expected and yield `None`.
	pub fn resolve(&self, id: u64) -> Option<&str>
	{
		self.usernames.get(&id).map(String::as_str)
	}

	/// Number of known users.
	pub fn len(&self) -> usize
	{
		self.usernames.len()
	}

	/// Whether no users are known at all.
	pub fn is_empty(&self) -> bool
	{
		self.usernames.is_empty()
	}
}
