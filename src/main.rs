#[doc(hidden)]
mod config;
#[doc(hidden)]
mod error;
pub mod gitlab_api;
#[doc(hidden)]
mod models;
pub mod slack;
pub mod translate;
#[doc(hidden)]
mod users;

pub use config::Config;
pub use error::Error;
pub use models::*;
pub use users::UserDirectory;

/// Maximum number of open merge requests listed by the merge request list command.
const SUMMARY_PAGE_SIZE: u32 = 30;

/// Ignore event payloads larger than 1 MiB, which should be enough for all valid events.
const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Relay GitLab merge request events to Slack.
#[derive(clap::Parser)]
#[command(version, about)]
struct Arguments
{
	/// Path to the configuration file in YAML format.
	#[arg(long, default_value = "config.yaml")]
	config: std::path::PathBuf,
}

/// Everything request handlers need, constructed once at startup and shared read-only.
#[derive(Clone)]
struct Context
{
	config: std::sync::Arc<Config>,
	gitlab_api_client: gitlab_api::Client,
	slack_client: slack::Client,
	users: std::sync::Arc<UserDirectory>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()>
{
	pretty_env_logger::init();

	use clap::Parser as _;

	let arguments = Arguments::parse();

	// Read the config file
	let config = Config::from_file(&arguments.config)?;

	match serde_yaml::to_string(&config)
	{
		Ok(config) => log::info!("configuration:\n{config}"),
		Err(error) => log::warn!("could not print configuration: {error}"),
	}

	let config = std::sync::Arc::new(config);

	let gitlab_api_client =
		gitlab_api::Client::from_config(std::sync::Arc::new(config.gitlab.clone()))?;
	let slack_client = slack::Client::from_config(config.clone())?;

	// Only the first page of users is retrieved, and the directory is never refreshed afterwards
	let users = UserDirectory::fetch(&gitlab_api_client).await;

	if users.is_empty()
	{
		log::warn!("no GitLab users known, user IDs will be shown instead of usernames");
	}

	let port = config.port;

	let context = Context
	{
		config,
		gitlab_api_client,
		slack_client,
		users: std::sync::Arc::new(users),
	};

	log::info!("listening for incoming webhook events and commands on 0.0.0.0:{port}");
	warp::serve(routes(context)).run(([0, 0, 0, 0], port)).await;

	Ok(())
}

/// All routes served by this application, including the handling of rejected requests.
fn routes(context: Context)
	-> impl warp::Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone
{
	use warp::Filter as _;

	let merge_request_list_command_route =
		warp::path!("cmd" / "mr" / "list")
		.and(warp::post())
		.and(with_context(context.clone()))
		.and_then(handle_merge_request_list_command);

	let merge_request_event_route =
		warp::path!("gl" / "mr")
		.and(warp::post())
		.and(warp::body::bytes())
		.and(with_context(context.clone()))
		.and_then(handle_merge_request_event);

	let push_event_route =
		warp::path!("gl" / "push")
		.and(warp::post())
		.and(warp::body::bytes())
		.and_then(handle_push_event);

	merge_request_list_command_route
		.or(merge_request_event_route)
		.or(push_event_route)
		.recover(handle_rejection)
}

/// [warp] filter relaying a handle to the shared context to request handlers.
fn with_context(context: Context)
	-> impl warp::Filter<Extract = (Context,), Error = std::convert::Infallible> + Clone
{
	use warp::Filter as _;

	warp::any().map(move || context.clone())
}

/// Request handler for the command listing all open merge requests in Slack.
///
/// # Arguments
/// - `context`: A handle to the shared context.
async fn handle_merge_request_list_command(context: Context)
	-> Result<impl warp::Reply, std::convert::Infallible>
{
	log::info!("received merge request list command");

	// List the merge requests in a separate task so as to immediately acknowledge the command
	tokio::spawn(async move {post_merge_request_summary(&context).await});

	Ok(warp::reply())
}

/// Post a summary of the open merge requests of the configured project to Slack.
async fn post_merge_request_summary(context: &Context)
{
	let project_id = &context.config.summary.project_id;

	let merge_requests = match context.gitlab_api_client
		.list_project_merge_requests(project_id, 1, SUMMARY_PAGE_SIZE, "opened").await
	{
		Ok(merge_requests) => merge_requests,
		Err(error) =>
		{
			error.log(&format!("could not list open merge requests of project “{project_id}”"));
			return;
		},
	};

	log::info!("summarizing {} open merge requests of project “{project_id}”",
		merge_requests.len());

	let notification = translate::summarize_merge_requests(&merge_requests, &context.config);

	if let Err(error) = context.slack_client.send(&notification).await
	{
		error.log("could not post summary of open merge requests");
	}
}

/// Request handler for merge request events. Events that can’t be handled are logged and still
/// acknowledged.
///
/// # Arguments
/// - `body`: The raw webhook event payload.
/// - `context`: A handle to the shared context.
async fn handle_merge_request_event(body: warp::hyper::body::Bytes, context: Context)
	-> Result<impl warp::Reply, std::convert::Infallible>
{
	let event: MergeRequestEvent = match decode_payload("merge request", &body)
	{
		Ok(event) => event,
		Err(error) =>
		{
			error.log("ignoring malformed merge request event");
			return Ok(warp::reply());
		},
	};

	match translate::translate_merge_request_event(&event, &context.users, &context.config)
	{
		// Post the notification in a separate task so as to immediately acknowledge the event
		Ok(notification) => context.slack_client.dispatch(notification),
		Err(error) => error.log("ignoring webhook event"),
	}

	Ok(warp::reply())
}

/// Request handler for push events, which are only logged.
///
/// # Arguments
/// - `body`: The raw webhook event payload.
async fn handle_push_event(body: warp::hyper::body::Bytes)
	-> Result<impl warp::Reply, std::convert::Infallible>
{
	match decode_payload::<PushEvent>("push", &body)
	{
		Ok(event) => log::info!("{}", translate::describe_push_event(&event)),
		Err(error) => error.log("ignoring malformed push event"),
	}

	Ok(warp::reply())
}

/// Decode a webhook event payload from JSON, refusing payloads above the size limit.
///
/// # Arguments
/// - `event_name`: Human-readable name of the expected event, used for logging.
/// - `body`: The raw webhook event payload.
fn decode_payload<T>(event_name: &str, body: &[u8]) -> Result<T, Error>
where
	T: serde::de::DeserializeOwned,
{
	if body.len() > MAX_PAYLOAD_SIZE
	{
		return Err(Error::PayloadTooLarge{size: body.len(), limit: MAX_PAYLOAD_SIZE});
	}

	log::debug!("received {event_name} event: {}", String::from_utf8_lossy(body));

	serde_json::from_slice(body).map_err(Error::DecodePayloadBody)
}

/// Request handler for all requests that were rejected previously.
///
/// # Arguments
/// - `error`: Reasons for why this request was rejected by all routes.
async fn handle_rejection(error: warp::Rejection)
	-> Result<impl warp::Reply, std::convert::Infallible>
{
	let status_code;
	let message;

	if error.is_not_found()
	{
		status_code = warp::http::StatusCode::NOT_FOUND;
		message = "not found";
	}
	else if let Some(_) = error.find::<warp::reject::MethodNotAllowed>()
	{
		status_code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
		message = "method not allowed";
	}
	// If users are able to trigger errors we did not anticipate, log them so we can inspect this
	// more closely later
	else
	{
		status_code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
		message = "internal server error";

		log::error!("unhandled error: {:#?}", error);
	}

	let response = warp::reply::json(&ErrorResponse{error: message});

	Ok(warp::reply::with_status(response, status_code))
}

/// Response type informing about rejected requests (serialized to JSON).
#[derive(serde::Serialize)]
struct ErrorResponse<'a>
{
	/// Error message with a human-readable explanation as to why this request failed.
	error: &'a str,
}

#[cfg(test)]
mod tests
{
	use super::*;
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	/// Wait up to two seconds until a mock server received at least `count` requests.
	pub(crate) async fn wait_for_requests(server: &MockServer, count: usize)
		-> Vec<wiremock::Request>
	{
		for _ in 0..100
		{
			let requests = server.received_requests().await.unwrap_or_default();

			if requests.len() >= count
			{
				return requests;
			}

			tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		}

		server.received_requests().await.unwrap_or_default()
	}

	/// Give detached tasks a chance to run, then check that Slack was never called.
	async fn assert_nothing_posted(slack: &MockServer)
	{
		tokio::time::sleep(std::time::Duration::from_millis(200)).await;

		let requests = slack.received_requests().await.unwrap_or_default();
		assert!(requests.is_empty(), "unexpected Slack requests: {requests:?}");
	}

	async fn slack_server() -> MockServer
	{
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/hook"))
			.respond_with(ResponseTemplate::new(200).set_body_string("ok"))
			.mount(&server)
			.await;
		server
	}

	fn context_for(gitlab: &MockServer, slack: &MockServer) -> Context
	{
		let mut config = Config::default();
		config.slack.incoming_webhook = format!("{}/hook", slack.uri());
		config.slack.username = "herald".to_owned();
		config.slack.icon_emoji = ":fox_face:".to_owned();
		config.slack.channel = "#mr".to_owned();
		config.gitlab.host = gitlab.uri();
		config.gitlab.api_path = "/api/v4".to_owned();
		config.gitlab.token = "token".to_owned();

		let config = std::sync::Arc::new(config);

		let users = UserDirectory::from_users(vec![
			User{id: 1, username: "alice".to_owned()},
			User{id: 2, username: "bob".to_owned()},
		]);

		Context
		{
			gitlab_api_client:
				gitlab_api::Client::from_config(std::sync::Arc::new(config.gitlab.clone()))
					.unwrap(),
			slack_client: slack::Client::from_config(config.clone()).unwrap(),
			config,
			users: std::sync::Arc::new(users),
		}
	}

	fn merge_request_event() -> serde_json::Value
	{
		serde_json::json!({
			"object_kind": "merge_request",
			"object_attributes": {
				"action": "update",
				"author_id": 1,
				"assignee_id": 2,
				"iid": 7,
				"source_branch": "feature",
				"target_branch": "main",
				"state": "merged",
				"target": {"namespace": "ns", "name": "proj"},
			},
		})
	}

	fn slack_body(request: &wiremock::Request) -> serde_json::Value
	{
		request.body_json().unwrap()
	}

	#[tokio::test]
	async fn posts_merge_request_events()
	{
		let gitlab = MockServer::start().await;
		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		let response = warp::test::request()
			.method("POST")
			.path("/gl/mr")
			.json(&merge_request_event())
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 200);
		assert!(response.body().is_empty());

		let requests = wait_for_requests(&slack, 1).await;
		assert_eq!(requests.len(), 1);
		assert_eq!(slack_body(&requests[0]), serde_json::json!({
			"text": format!("<{}/ns/proj/merge_requests/7> *feature* (_by alice_) merged",
				gitlab.uri()),
			"username": "bob",
			"icon_emoji": ":fox_face:",
			"channel": "#mr",
		}));
	}

	#[tokio::test]
	async fn posts_identical_events_twice()
	{
		let gitlab = MockServer::start().await;
		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		for _ in 0..2
		{
			let response = warp::test::request()
				.method("POST")
				.path("/gl/mr")
				.json(&merge_request_event())
				.reply(&routes)
				.await;

			assert_eq!(response.status(), 200);
		}

		let requests = wait_for_requests(&slack, 2).await;
		assert_eq!(requests.len(), 2);
		assert_eq!(slack_body(&requests[0]), slack_body(&requests[1]));
	}

	#[tokio::test]
	async fn acknowledges_but_ignores_other_event_kinds()
	{
		let gitlab = MockServer::start().await;
		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		let mut event = merge_request_event();
		event["object_kind"] = serde_json::json!("note");

		let response = warp::test::request()
			.method("POST")
			.path("/gl/mr")
			.json(&event)
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 200);
		assert!(response.body().is_empty());
		assert_nothing_posted(&slack).await;
	}

	#[tokio::test]
	async fn acknowledges_but_ignores_malformed_payloads()
	{
		let gitlab = MockServer::start().await;
		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		let response = warp::test::request()
			.method("POST")
			.path("/gl/mr")
			.body("{\"object_kind\": ")
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 200);

		let response = warp::test::request()
			.method("POST")
			.path("/gl/mr")
			.json(&serde_json::json!({"object_kind": "merge_request"}))
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 200);
		assert_nothing_posted(&slack).await;
	}

	#[tokio::test]
	async fn acknowledges_events_without_content_length()
	{
		let gitlab = MockServer::start().await;
		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		for route in ["/gl/mr", "/gl/push"]
		{
			let response = warp::test::request()
				.method("POST")
				.path(route)
				.header("transfer-encoding", "chunked")
				.reply(&routes)
				.await;

			assert_eq!(response.status(), 200);
			assert!(response.body().is_empty());
		}

		assert_nothing_posted(&slack).await;
	}

	#[tokio::test]
	async fn acknowledges_but_ignores_oversized_events()
	{
		let gitlab = MockServer::start().await;
		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		let mut event = merge_request_event();
		event["object_attributes"]["description"] = serde_json::json!("x".repeat(2 * 1024 * 1024));

		for route in ["/gl/mr", "/gl/push"]
		{
			let response = warp::test::request()
				.method("POST")
				.path(route)
				.json(&event)
				.reply(&routes)
				.await;

			assert_eq!(response.status(), 200);
			assert!(response.body().is_empty());
		}

		assert_nothing_posted(&slack).await;
	}

	#[test]
	fn limits_payload_size()
	{
		let body = vec![b' '; MAX_PAYLOAD_SIZE];
		let result = decode_payload::<PushEvent>("push", &body);
		assert!(matches!(result, Err(Error::DecodePayloadBody(_))));

		let body = vec![b' '; MAX_PAYLOAD_SIZE + 1];
		let result = decode_payload::<PushEvent>("push", &body);
		assert!(matches!(result,
			Err(Error::PayloadTooLarge{size, limit}) if size == MAX_PAYLOAD_SIZE + 1
				&& limit == MAX_PAYLOAD_SIZE));

		let result = decode_payload::<PushEvent>("push", br#"{"ref": "refs/heads/main"}"#);
		assert_eq!(result.unwrap().ref_, "refs/heads/main");
	}

	#[tokio::test]
	async fn only_logs_push_events()
	{
		let gitlab = MockServer::start().await;
		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		let response = warp::test::request()
			.method("POST")
			.path("/gl/push")
			.json(&serde_json::json!({
				"object_kind": "push",
				"before": "95790bf8",
				"ref": "refs/heads/main",
				"repository": {"name": "app", "homepage": "http://gitlab/team/app"},
			}))
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 200);
		assert!(response.body().is_empty());

		let response = warp::test::request()
			.method("POST")
			.path("/gl/push")
			.body("not json")
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 200);
		assert_nothing_posted(&slack).await;
	}

	#[tokio::test]
	async fn posts_summary_of_open_merge_requests()
	{
		let gitlab = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/v4/projects/208/merge_requests"))
			.and(query_param("state", "opened"))
			.and(query_param("per_page", "30"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
				{"iid": 3, "source_branch": "fix", "assignee": {"id": 2, "username": "bob"}},
				{"iid": 4, "source_branch": "feature", "assignee": null},
			])))
			.expect(1)
			.mount(&gitlab)
			.await;

		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		let response = warp::test::request()
			.method("POST")
			.path("/cmd/mr/list")
			.body("text=ignored")
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 200);
		assert!(response.body().is_empty());

		let requests = wait_for_requests(&slack, 1).await;
		assert_eq!(requests.len(), 1);

		let host = gitlab.uri();
		let body = slack_body(&requests[0]);
		assert_eq!(body["username"], "herald");
		assert_eq!(body["text"], format!(
			"MR <{host}/p/higgs/merge_requests/3> *fix* _assignee_:bob\n\
			MR <{host}/p/higgs/merge_requests/4> *feature* _assignee_:???\n"));
	}

	#[tokio::test]
	async fn posts_empty_summary_without_open_merge_requests()
	{
		let gitlab = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/v4/projects/208/merge_requests"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
			.mount(&gitlab)
			.await;

		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		let response = warp::test::request()
			.method("POST")
			.path("/cmd/mr/list")
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 200);

		let requests = wait_for_requests(&slack, 1).await;
		assert_eq!(requests.len(), 1);

		let body = slack_body(&requests[0]);
		assert_eq!(body["text"], "");
		assert_eq!(body["username"], "herald");
	}

	#[tokio::test]
	async fn aborts_summary_on_gitlab_errors()
	{
		let gitlab = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&gitlab)
			.await;

		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		let response = warp::test::request()
			.method("POST")
			.path("/cmd/mr/list")
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 200);
		assert_nothing_posted(&slack).await;
	}

	#[tokio::test]
	async fn rejects_unknown_routes_and_methods()
	{
		let gitlab = MockServer::start().await;
		let slack = slack_server().await;
		let routes = routes(context_for(&gitlab, &slack));

		let response = warp::test::request()
			.method("POST")
			.path("/gl/tag")
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 404);

		let response = warp::test::request()
			.method("GET")
			.path("/gl/mr")
			.reply(&routes)
			.await;

		assert_eq!(response.status(), 405);
	}
}
