use careerhub_auth::RouteClassifier;
use reqwest::StatusCode;
use reqwest::header::{COOKIE, LOCATION};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = careerhub_edge::app::build_app(RouteClassifier::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

async fn fetch(server: &TestServer, path: &str, cookie: Option<&str>) -> (StatusCode, Option<String>) {
    let mut req = client().get(format!("{}{}", server.base_url, path));
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    let res = req.send().await.unwrap();
    let location = res
        .headers()
        .get(LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    (res.status(), location)
}

#[tokio::test]
async fn decision_table_end_to_end() {
    let server = TestServer::spawn().await;
    let evidence = Some("refresh_token=opaque-value");

    // Protected without evidence -> sign-in.
    assert_eq!(
        fetch(&server, "/dashboard", None).await,
        (StatusCode::SEE_OTHER, Some("/signin".to_string()))
    );
    assert_eq!(
        fetch(&server, "/super-admin/users", None).await,
        (StatusCode::SEE_OTHER, Some("/signin".to_string()))
    );

    // Protected with evidence -> through, role check deferred to the page.
    assert_eq!(fetch(&server, "/dashboard", evidence).await, (StatusCode::OK, None));
    assert_eq!(fetch(&server, "/super-admin", evidence).await, (StatusCode::OK, None));

    // Auth pages with evidence -> home.
    assert_eq!(
        fetch(&server, "/signin", evidence).await,
        (StatusCode::SEE_OTHER, Some("/".to_string()))
    );
    assert_eq!(
        fetch(&server, "/signup", evidence).await,
        (StatusCode::SEE_OTHER, Some("/".to_string()))
    );

    // Public and unclassified pages are always allowed.
    assert_eq!(fetch(&server, "/signin", None).await, (StatusCode::OK, None));
    assert_eq!(fetch(&server, "/", None).await, (StatusCode::OK, None));
    assert_eq!(fetch(&server, "/pricing", evidence).await, (StatusCode::OK, None));
    assert_eq!(fetch(&server, "/somewhere-new", None).await, (StatusCode::OK, None));
}

#[tokio::test]
async fn role_cookie_is_not_session_evidence() {
    let server = TestServer::spawn().await;
    assert_eq!(
        fetch(&server, "/dashboard", Some("user-role=super_admin")).await,
        (StatusCode::SEE_OTHER, Some("/signin".to_string()))
    );
}

#[tokio::test]
async fn static_assets_and_api_are_not_intercepted() {
    let server = TestServer::spawn().await;
    assert_eq!(fetch(&server, "/api/health", None).await, (StatusCode::OK, None));
    assert_eq!(fetch(&server, "/dashboard/logo.png", None).await, (StatusCode::OK, None));
}

#[tokio::test]
async fn shell_renders_the_requested_path() {
    let server = TestServer::spawn().await;
    let body: serde_json::Value = client()
        .get(format!("{}/dashboard/courses", server.base_url))
        .header(COOKIE, "refresh_token=x")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["render"], "/dashboard/courses");
}
