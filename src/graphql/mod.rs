//! GraphQL surface. Resolvers stay thin: parse arguments, resolve the caller
//! through the request's [`AuthContext`] when needed, call a service.

mod mutation;
mod query;
pub mod types;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Schema, ID};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Extension, Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

pub use mutation::{MutationRoot, REGISTER_SUCCESS};
pub use query::QueryRoot;

use crate::{
    auth::AuthContext,
    error::{ApiError, ApiResult},
    state::AppState,
    users::repo_types::User,
};

pub type ApiSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> ApiSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}

pub fn router() -> Router<AppState> {
    Router::new().route("/graphql", post(graphql_handler))
}

#[instrument(skip_all)]
pub async fn graphql_handler(
    State(state): State<AppState>,
    Extension(schema): Extension<ApiSchema>,
    headers: HeaderMap,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let auth = AuthContext::from_headers(&headers, &state);
    Json(schema.execute(request.data(auth)).await)
}

/// Converts service errors into GraphQL errors that keep their `code`.
pub(crate) trait ApiResultExt<T> {
    fn extended(self) -> async_graphql::Result<T>;
}

impl<T> ApiResultExt<T> for ApiResult<T> {
    fn extended(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.extend())
    }
}

pub(crate) fn app_state<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a AppState> {
    ctx.data::<AppState>()
}

pub(crate) async fn require_user(ctx: &Context<'_>) -> async_graphql::Result<User> {
    ctx.data::<AuthContext>()?.current_user().await.extended()
}

pub(crate) fn parse_id(id: Option<&ID>, missing: &str) -> ApiResult<Uuid> {
    let raw = id
        .map(|id| id.as_str().trim())
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ApiError::validation(missing))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::validation("Invalid id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::{Request, Variables};
    use serde_json::{json, Value};

    struct Harness {
        state: AppState,
        schema: ApiSchema,
    }

    impl Harness {
        fn new() -> Self {
            let state = AppState::fake();
            let schema = build_schema(state.clone());
            Self { state, schema }
        }

        async fn exec(&self, token: Option<&str>, query: &str, vars: Value) -> async_graphql::Response {
            let auth = AuthContext::new(token.map(|t| format!("Bearer {t}")), &self.state);
            let req = Request::new(query)
                .variables(Variables::from_json(vars))
                .data(auth);
            self.schema.execute(req).await
        }

        async fn ok(&self, token: Option<&str>, query: &str, vars: Value) -> Value {
            let resp = self.exec(token, query, vars).await;
            assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
            resp.data.into_json().unwrap()
        }

        async fn err(&self, token: Option<&str>, query: &str, vars: Value) -> (String, String) {
            let resp = self.exec(token, query, vars).await;
            let err = resp.errors.first().expect("an error").clone();
            let code = err
                .extensions
                .as_ref()
                .and_then(|ext| match ext.get("code") {
                    Some(async_graphql::Value::String(code)) => Some(code.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            (err.message, code)
        }

        async fn register_and_login(&self, username: &str) -> String {
            let data = self
                .ok(
                    None,
                    "mutation($u: String, $e: String) { register(username: $u, email: $e, password: \"pw1234\") }",
                    json!({ "u": username, "e": format!("{username}@x.com") }),
                )
                .await;
            assert_eq!(data["register"], REGISTER_SUCCESS);
            let data = self
                .ok(
                    None,
                    "mutation($u: String) { login(username: $u, password: \"pw1234\") { access_token } }",
                    json!({ "u": username }),
                )
                .await;
            data["login"]["access_token"].as_str().unwrap().to_string()
        }
    }

    const GET_POSTS: &str = "{ getPosts { _id content tags authorId author { username } likes { username } comments { content username } } }";

    #[tokio::test]
    async fn auth_required_operations_fail_without_header() {
        let h = Harness::new();
        let ops = [
            "{ getPosts { _id } }",
            "{ getPostById(id: \"00000000-0000-0000-0000-000000000000\") { _id } }",
            "mutation { addPost(content: \"x\") }",
            "mutation { likePost(postId: \"00000000-0000-0000-0000-000000000000\") }",
            "mutation { commentPost(postId: \"00000000-0000-0000-0000-000000000000\", content: \"x\") { content } }",
            "mutation { followUser(followingId: \"00000000-0000-0000-0000-000000000000\") }",
        ];
        for op in ops {
            let (message, code) = h.err(None, op, json!({})).await;
            assert_eq!(message, "Please login first", "{op}");
            assert_eq!(code, "UNAUTHENTICATED", "{op}");
        }
        // nothing reached the store
        assert!(h.state.store.list_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let h = Harness::new();
        let token = h.register_and_login("alice").await;

        let (message, code) = h
            .err(
                None,
                "mutation { register(username: \"alice\", email: \"alice@x.com\", password: \"pw1234\") }",
                json!({}),
            )
            .await;
        assert_eq!(message, "User already exists");
        assert_eq!(code, "BAD_USER_INPUT");

        let data = h
            .ok(Some(&token), "mutation { addPost(content: \"hi\", tags: [\"#a#b\"]) }", json!({}))
            .await;
        assert_eq!(data["addPost"], "Post created successfully");

        let data = h.ok(Some(&token), GET_POSTS, json!({})).await;
        let post = &data["getPosts"][0];
        assert_eq!(post["content"], "hi");
        assert_eq!(post["tags"], json!(["#a", "#b"]));
        assert_eq!(post["author"]["username"], "alice");
        let post_id = post["_id"].as_str().unwrap().to_string();

        let like = "mutation($id: ID) { likePost(postId: $id) }";
        let data = h.ok(Some(&token), like, json!({ "id": post_id })).await;
        assert_eq!(data["likePost"], "liked");
        let data = h.ok(Some(&token), GET_POSTS, json!({})).await;
        assert_eq!(data["getPosts"][0]["likes"], json!([{ "username": "alice" }]));

        let data = h.ok(Some(&token), like, json!({ "id": post_id })).await;
        assert_eq!(data["likePost"], "unliked");
        let data = h.ok(Some(&token), GET_POSTS, json!({})).await;
        assert_eq!(data["getPosts"][0]["likes"], json!([]));

        let data = h
            .ok(
                Some(&token),
                "mutation($id: ID) { commentPost(postId: $id, content: \"hello\") { content username } }",
                json!({ "id": post_id }),
            )
            .await;
        assert_eq!(
            data["commentPost"],
            json!([{ "content": "hello", "username": "alice" }])
        );
    }

    #[tokio::test]
    async fn get_post_by_id_errors() {
        let h = Harness::new();
        let token = h.register_and_login("alice").await;
        let q = "query($id: ID) { getPostById(id: $id) { _id } }";

        let (message, code) = h.err(Some(&token), q, json!({ "id": "not-a-uuid" })).await;
        assert_eq!((message.as_str(), code.as_str()), ("Invalid id", "BAD_USER_INPUT"));

        let (message, code) = h
            .err(Some(&token), q, json!({ "id": Uuid::new_v4().to_string() }))
            .await;
        assert_eq!((message.as_str(), code.as_str()), ("Post not found", "NOT_FOUND"));
    }

    #[tokio::test]
    async fn add_post_empty_and_duplicate_are_rejected() {
        let h = Harness::new();
        let token = h.register_and_login("alice").await;
        let add = "mutation($c: String) { addPost(content: $c) }";

        let (message, _) = h.err(Some(&token), add, json!({ "c": "" })).await;
        assert_eq!(message, "Content is required");

        h.ok(Some(&token), add, json!({ "c": "dup" })).await;
        let (message, code) = h.err(Some(&token), add, json!({ "c": "dup" })).await;
        assert_eq!(message, "Post already exists");
        assert_eq!(code, "BAD_USER_INPUT");
    }

    #[tokio::test]
    async fn follow_toggle_and_network() {
        let h = Harness::new();
        let alice = h.register_and_login("alice").await;
        h.register_and_login("bob").await;

        let data = h
            .ok(None, "{ findUser(username: \"bob\") { _id username } }", json!({}))
            .await;
        let bob_id = data["findUser"][0]["_id"].as_str().unwrap().to_string();

        let follow = "mutation($id: ID) { followUser(followingId: $id) }";
        let data = h.ok(Some(&alice), follow, json!({ "id": bob_id })).await;
        assert_eq!(data["followUser"], "followed");

        let data = h
            .ok(
                None,
                "query($id: ID) { findUserById(id: $id) { username userFollowers { username } userFollowings { username } } }",
                json!({ "id": bob_id }),
            )
            .await;
        assert_eq!(data["findUserById"]["userFollowers"], json!([{ "username": "alice" }]));
        assert_eq!(data["findUserById"]["userFollowings"], json!([]));

        let data = h.ok(Some(&alice), follow, json!({ "id": bob_id })).await;
        assert_eq!(data["followUser"], "unfollowed");

        let (message, _) = h.err(Some(&alice), follow, json!({})).await;
        assert_eq!(message, "Following ID required");
    }

    #[tokio::test]
    async fn find_user_without_filters_lists_everyone() {
        let h = Harness::new();
        h.register_and_login("alice").await;
        h.register_and_login("bob").await;
        let data = h.ok(None, "{ findUser { username } }", json!({})).await;
        assert_eq!(data["findUser"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn login_with_bad_password_is_generic() {
        let h = Harness::new();
        h.register_and_login("alice").await;
        let (message, code) = h
            .err(
                None,
                "mutation { login(username: \"alice\", password: \"nope!\") { access_token } }",
                json!({}),
            )
            .await;
        assert_eq!(message, "Invalid username or password");
        assert_eq!(code, "UNAUTHENTICATED");
    }

    #[test]
    fn parse_id_rules() {
        assert!(matches!(parse_id(None, "Id is required"), Err(ApiError::Validation(m)) if m == "Id is required"));
        assert!(matches!(parse_id(Some(&ID::from("")), "x"), Err(ApiError::Validation(m)) if m == "x"));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(Some(&ID::from(id.to_string())), "x").unwrap(), id);
    }
}
