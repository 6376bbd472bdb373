use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::instrument;

use crate::db::Db;
use crate::payment::response::SelfLink;
use crate::payment::{Payment, PaymentError, service};
use crate::state::AppState;

#[instrument(skip_all)]
async fn create_payment(
    State(db): State<Db>,
    link: SelfLink,
    Json(payment): Json<Payment>,
) -> Response {
    match service::create(&db, payment).await {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => link.error(e),
    }
}

#[instrument(skip_all, fields(id = %id))]
async fn get_payment(State(db): State<Db>, Path(id): Path<String>, link: SelfLink) -> Response {
    match service::get(&db, &id).await {
        Ok(payment) => link.data(StatusCode::OK, payment).into_response(),
        Err(e) => link.error(e),
    }
}

#[instrument(skip_all, fields(id = %id))]
async fn update_payment(
    State(db): State<Db>,
    Path(id): Path<String>,
    link: SelfLink,
    Json(payment): Json<Payment>,
) -> Response {
    match service::update(&db, &id, payment).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => link.error(e),
    }
}

#[instrument(skip_all, fields(id = %id))]
async fn delete_payment(State(db): State<Db>, Path(id): Path<String>, link: SelfLink) -> Response {
    match service::delete(&db, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => link.error(e),
    }
}

/// Raw query parameters. Anything unparseable falls back to the defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    offset: Option<String>,
    limit: Option<String>,
}

#[instrument(skip_all)]
async fn list_payments(
    State(db): State<Db>,
    Query(query): Query<ListQuery>,
    link: SelfLink,
) -> Response {
    let offset = service::clamp_offset(query.offset.as_deref());
    let limit = service::clamp_limit(query.limit.as_deref());
    match service::list(&db, offset, limit).await {
        Ok(payments) => link.data(StatusCode::OK, payments).into_response(),
        Err(e) => link.error(e),
    }
}

/// Routes for the payment resource under the configured base prefix.
pub fn router(base_path: &str) -> axum::Router<AppState> {
    axum::Router::new()
        .route(&format!("{base_path}/payment"), post(create_payment))
        .route(
            &format!("{base_path}/payment/{{id}}"),
            get(get_payment).put(update_payment).delete(delete_payment),
        )
        .route(&format!("{base_path}/payments"), get(list_payments))
}

/// `Json` extractor wrapper that turns `axum::extract::Json` rejections into
/// enveloped 400 responses.
pub struct Json<T>(pub T);

impl<S, T> axum::extract::FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let link = SelfLink(format!("{host}{}", req.uri()));
        let rejection = match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => return Ok(Self(value)),
            Err(e) => e.to_string(),
        };
        Err(link.error(PaymentError::BadRequest(rejection)))
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::db::Db;
    use crate::health;
    use crate::payment::testing::sample_payment;
    use crate::payment::{Payment, api};
    use crate::state::AppState;

    async fn app() -> Router {
        let db = Db::connect_memory().await.unwrap();
        let state = AppState::new(db);
        api::router("/v1").merge(health::router()).with_state(state)
    }

    fn json_request(method: &str, uri: &str, payment: &Payment) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "example.test")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(payment).unwrap()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "example.test")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn full_crud_flow() {
        let app = app().await;
        let payment = sample_payment("p-1");

        let created = app
            .clone()
            .oneshot(json_request("POST", "/v1/payment", &payment))
            .await
            .unwrap();
        assert_eq!(StatusCode::CREATED, created.status());

        let fetched = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payment/p-1"))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, fetched.status());
        let body = body_json(fetched).await;
        assert_eq!(
            serde_json::to_value(&payment).unwrap(),
            body["data"],
        );
        assert_eq!(
            serde_json::json!("example.test/v1/payment/p-1"),
            body["links"]["self"]
        );
        assert!(body.get("error").is_none());

        let mut replacement = sample_payment("body-id-is-ignored");
        replacement.organisation_id = "updated-org".into();
        let updated = app
            .clone()
            .oneshot(json_request("PUT", "/v1/payment/p-1", &replacement))
            .await
            .unwrap();
        assert_eq!(StatusCode::NO_CONTENT, updated.status());

        let refetched = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payment/p-1"))
            .await
            .unwrap();
        let body = body_json(refetched).await;
        assert_eq!(serde_json::json!("p-1"), body["data"]["id"]);
        assert_eq!(
            serde_json::json!("updated-org"),
            body["data"]["organisation_id"]
        );

        let deleted = app
            .clone()
            .oneshot(empty_request("DELETE", "/v1/payment/p-1"))
            .await
            .unwrap();
        assert_eq!(StatusCode::NO_CONTENT, deleted.status());

        let gone = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payment/p-1"))
            .await
            .unwrap();
        assert_eq!(StatusCode::NOT_FOUND, gone.status());
    }

    #[tokio::test]
    async fn create_replay_is_idempotent() {
        let app = app().await;
        let payment = sample_payment("p-1");
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/v1/payment", &payment))
                .await
                .unwrap();
            assert_eq!(StatusCode::CREATED, response.status());
        }

        let listed = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payments"))
            .await
            .unwrap();
        let body = body_json(listed).await;
        assert_eq!(1, body["data"].as_array().unwrap().len());
    }

    #[tokio::test]
    async fn create_conflicts_on_differing_payload() {
        let app = app().await;
        let payment = sample_payment("p-1");
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/payment", &payment))
            .await
            .unwrap();
        assert_eq!(StatusCode::CREATED, response.status());

        let mut other = payment.clone();
        other.attributes.amount = "0.01".into();
        let conflict = app
            .clone()
            .oneshot(json_request("POST", "/v1/payment", &other))
            .await
            .unwrap();
        assert_eq!(StatusCode::CONFLICT, conflict.status());
        let body = body_json(conflict).await;
        assert_eq!(serde_json::json!(409), body["error"]["code"]);
        assert_eq!(serde_json::json!("already exists"), body["error"]["msg"]);

        // the stored record is the original one
        let fetched = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payment/p-1"))
            .await
            .unwrap();
        let body = body_json(fetched).await;
        assert_eq!(serde_json::to_value(&payment).unwrap(), body["data"]);
    }

    #[tokio::test]
    async fn invalid_payment_is_bad_request() {
        let app = app().await;
        let mut payment = sample_payment("p-1");
        payment.attributes.currency.clear();
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/payment", &payment))
            .await
            .unwrap();
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        let body = body_json(response).await;
        assert_eq!(
            serde_json::json!("required field attributes.currency is empty"),
            body["error"]["msg"]
        );

        payment = sample_payment("p-1");
        payment.kind = "Refund".into();
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/payment", &payment))
            .await
            .unwrap();
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/v1/payment")
            .header(header::HOST, "example.test")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = app().await;
        let get = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payment/ghost"))
            .await
            .unwrap();
        assert_eq!(StatusCode::NOT_FOUND, get.status());
        let body = body_json(get).await;
        assert_eq!(
            serde_json::json!("paymentID:ghost not found"),
            body["error"]["msg"]
        );

        let put = app
            .clone()
            .oneshot(json_request("PUT", "/v1/payment/ghost", &sample_payment("ghost")))
            .await
            .unwrap();
        assert_eq!(StatusCode::NOT_FOUND, put.status());

        let delete = app
            .clone()
            .oneshot(empty_request("DELETE", "/v1/payment/ghost"))
            .await
            .unwrap();
        assert_eq!(StatusCode::NOT_FOUND, delete.status());
    }

    #[tokio::test]
    async fn listing_clamps_and_paginates() {
        let app = app().await;

        let empty = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payments"))
            .await
            .unwrap();
        assert_eq!(StatusCode::NOT_FOUND, empty.status());

        for id in ["p-1", "p-2", "p-3"] {
            app.clone()
                .oneshot(json_request("POST", "/v1/payment", &sample_payment(id)))
                .await
                .unwrap();
        }

        let listed = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payments?offset=0&limit=5"))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, listed.status());
        let body = body_json(listed).await;
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(vec!["p-3", "p-2", "p-1"], ids);

        // garbage values fall back to the defaults instead of failing
        let clamped = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payments?offset=junk&limit=-3"))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, clamped.status());
        let body = body_json(clamped).await;
        assert_eq!(3, body["data"].as_array().unwrap().len());

        let beyond = app
            .clone()
            .oneshot(empty_request("GET", "/v1/payments?offset=3&limit=5"))
            .await
            .unwrap();
        assert_eq!(StatusCode::NOT_FOUND, beyond.status());
    }

    #[tokio::test]
    async fn health_reports_alive() {
        let app = app().await;
        let response = app
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
        let body = body_json(response).await;
        assert_eq!(serde_json::json!({"alive": true}), body);
    }

    #[tokio::test]
    async fn health_reports_unhealthy_store() {
        let db = Db::connect_memory().await.unwrap();
        db.close().await;
        let app: Router = api::router("/v1")
            .merge(health::router())
            .with_state(AppState::new(db));
        let response = app
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
        let body = body_json(response).await;
        assert_eq!(serde_json::json!({"alive": false}), body);
    }
}
