// crates.io
use httpmock::prelude::*;
// self
use link_broker::{
	_preludet::*,
	error::ConfigError,
	flows::LinkMode,
	link::{Environment, ProductSet},
	provider::ProviderDescriptor,
};

const CLIENT_ID: &str = "client-issue";
const CLIENT_SECRET: &str = "secret-issue";

fn build_descriptor(server: &MockServer) -> ProviderDescriptor {
	ProviderDescriptor::builder(Environment::Sandbox)
		.link_token_endpoint(
			Url::parse(&server.url("/link/token/create"))
				.expect("Mock link-token endpoint should parse successfully."),
		)
		.payment_link_token_endpoint(
			Url::parse(&server.url("/link/token/create/payment"))
				.expect("Mock payment endpoint should parse successfully."),
		)
		.user_token_endpoint(
			Url::parse(&server.url("/user/create"))
				.expect("Mock user-token endpoint should parse successfully."),
		)
		.exchange_endpoint(
			Url::parse(&server.url("/item/public_token/exchange"))
				.expect("Mock exchange endpoint should parse successfully."),
		)
		.build()
		.expect("Provider descriptor should build successfully.")
}

fn products(values: &[&str]) -> ProductSet {
	ProductSet::new(values.iter().copied()).expect("Product set should be valid for issue tests.")
}

#[tokio::test]
async fn standard_issuance_posts_credentials_and_returns_the_token() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (broker, _store) = build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/link/token/create").json_body_includes(
				r#"{
					"client_id": "client-issue",
					"secret": "secret-issue",
					"user": { "client_user_id": "default_user" },
					"products": ["auth", "transactions"],
					"country_codes": ["US"]
				}"#,
			);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"link_token":"link-sandbox-token-1","expiration":"2026-01-01T00:00:00Z"}"#);
		})
		.await;
	let token = broker
		.issue_link_token(&products(&["transactions", "auth"]), LinkMode::Standard)
		.await
		.expect("Standard issuance should succeed.");

	assert_eq!(token.as_str(), "link-sandbox-token-1");

	mock.assert_async().await;
}

#[tokio::test]
async fn payment_mode_routes_to_the_payment_endpoint() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (broker, _store) = build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let standard_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/link/token/create");
			then.status(500);
		})
		.await;
	let payment_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/link/token/create/payment");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"link_token":"link-payment-token-1"}"#);
		})
		.await;
	let selection = products(&["payment_initiation"]);
	let mode = LinkMode::infer(&selection);
	let token = broker
		.issue_link_token(&selection, mode)
		.await
		.expect("Payment issuance should succeed.");

	assert_eq!(mode, LinkMode::PaymentInitiation);
	assert_eq!(token.as_str(), "link-payment-token-1");

	standard_mock.assert_calls_async(0).await;
	payment_mock.assert_async().await;
}

#[tokio::test]
async fn cra_exclusive_selections_use_the_user_token_endpoint() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (broker, _store) = build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/user/create");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"user_token":"user-token-1"}"#);
		})
		.await;
	let selection = products(&["cra_base_report"]);
	let mode = LinkMode::infer(&selection);
	let token =
		broker.issue_link_token(&selection, mode).await.expect("User issuance should succeed.");

	assert_eq!(mode, LinkMode::UserTokenOnly);
	assert_eq!(token.as_str(), "user-token-1");

	mock.assert_async().await;
}

#[tokio::test]
async fn missing_mode_endpoint_is_a_configuration_error() {
	let server = MockServer::start_async().await;
	let descriptor = ProviderDescriptor::builder(Environment::Sandbox)
		.link_token_endpoint(
			Url::parse(&server.url("/link/token/create"))
				.expect("Mock link-token endpoint should parse successfully."),
		)
		.exchange_endpoint(
			Url::parse(&server.url("/item/public_token/exchange"))
				.expect("Mock exchange endpoint should parse successfully."),
		)
		.build()
		.expect("Provider descriptor should build successfully.");
	let (broker, _store) = build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let err = broker
		.issue_link_token(&products(&["payment_initiation"]), LinkMode::PaymentInitiation)
		.await
		.expect_err("Issuance without the payment endpoint must fail.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::UnsupportedMode { endpoint: "payment-link-token", .. }),
	));
}

#[tokio::test]
async fn provider_rejections_surface_verbatim() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (broker, _store) = build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/link/token/create");
			then.status(400).header("content-type", "application/json").body(
				r#"{"error_type":"INVALID_REQUEST","error_code":"INVALID_PRODUCT","error_message":"the requested product is not enabled","display_message":null,"request_id":"req-issue-1"}"#,
			);
		})
		.await;
	let err = broker
		.issue_link_token(&products(&["transactions"]), LinkMode::Standard)
		.await
		.expect_err("Provider rejection should surface to the caller.");

	match err {
		Error::Issuer(rejection) => {
			assert_eq!(rejection.status, 400);
			assert_eq!(rejection.payload.error_code.as_deref(), Some("INVALID_PRODUCT"));
			assert_eq!(
				rejection.payload.error_message.as_deref(),
				Some("the requested product is not enabled"),
			);
			assert_eq!(rejection.payload.request_id.as_deref(), Some("req-issue-1"));
			assert!(rejection.body.contains("INVALID_PRODUCT"), "Raw body must be preserved.");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	mock.assert_async().await;
}

#[tokio::test]
async fn malformed_success_bodies_are_response_errors() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (broker, _store) = build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/link/token/create");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"unexpected":"shape"}"#);
		})
		.await;
	let err = broker
		.issue_link_token(&products(&["transactions"]), LinkMode::Standard)
		.await
		.expect_err("Malformed success body should fail to decode.");

	assert!(matches!(err, Error::Response(_)));

	mock.assert_async().await;
}
