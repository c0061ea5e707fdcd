use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::gate::AuthGate;
use super::model::{CommentView, PostView, UserView};

const POST_FIELDS: &str = "_id content tags imgUrl authorId createdAt updatedAt \
    author { _id name username email } \
    likes { username createdAt updatedAt } \
    comments { content username createdAt updatedAt }";

const USER_FIELDS: &str = "_id name username email";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// First error message reported by the server.
    #[error("{0}")]
    Graphql(String),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Credentials(#[from] anyhow::Error),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<ServerError>,
}

#[derive(Deserialize)]
struct ServerError {
    message: String,
}

/// Typed calls against the `/graphql` endpoint. The stored token, if any,
/// is sent as a bearer credential on every request.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: String,
    gate: AuthGate,
}

impl ApiClient {
    pub fn new(endpoint: impl Into<String>, gate: AuthGate) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            gate,
        }
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    #[instrument(skip(self, query, variables))]
    async fn execute<T: DeserializeOwned>(
        &self,
        field: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = self.gate.token()? {
            req = req.bearer_auth(token);
        }
        let envelope: Envelope = req.send().await?.error_for_status()?.json().await?;

        if let Some(err) = envelope.errors.into_iter().next() {
            debug!(message = %err.message, "server returned an error");
            return Err(ClientError::Graphql(err.message));
        }
        let value = envelope
            .data
            .and_then(|mut data| data.get_mut(field).map(Value::take))
            .ok_or_else(|| ClientError::UnexpectedResponse(format!("missing field {field}")))?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_posts(&self) -> Result<Vec<PostView>, ClientError> {
        let query = format!("query {{ getPosts {{ {POST_FIELDS} }} }}");
        self.execute("getPosts", &query, json!({})).await
    }

    pub async fn get_post_by_id(&self, id: &str) -> Result<PostView, ClientError> {
        let query = format!("query($id: ID) {{ getPostById(id: $id) {{ {POST_FIELDS} }} }}");
        self.execute("getPostById", &query, json!({ "id": id })).await
    }

    pub async fn find_posts_by_author(&self, author_id: &str) -> Result<Vec<PostView>, ClientError> {
        let query = format!(
            "query($id: ID) {{ findPostsByAuthor(authorId: $id) {{ {POST_FIELDS} }} }}"
        );
        self.execute("findPostsByAuthor", &query, json!({ "id": author_id }))
            .await
    }

    pub async fn find_user(
        &self,
        name: Option<&str>,
        username: Option<&str>,
    ) -> Result<Vec<UserView>, ClientError> {
        let query = format!(
            "query($name: String, $username: String) {{ findUser(name: $name, username: $username) {{ {USER_FIELDS} }} }}"
        );
        self.execute("findUser", &query, json!({ "name": name, "username": username }))
            .await
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<UserView, ClientError> {
        let query = format!(
            "query($id: ID) {{ findUserById(id: $id) {{ {USER_FIELDS} userFollowers {{ {USER_FIELDS} }} userFollowings {{ {USER_FIELDS} }} }} }}"
        );
        self.execute("findUserById", &query, json!({ "id": id })).await
    }

    pub async fn register(
        &self,
        name: Option<&str>,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<String, ClientError> {
        let query = "mutation($name: String, $username: String, $email: String, $password: String) \
            { register(name: $name, username: $username, email: $email, password: $password) }";
        self.execute(
            "register",
            query,
            json!({ "name": name, "username": username, "email": email, "password": password }),
        )
        .await
    }

    /// Returns the access token; storing it is up to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct Login {
            access_token: String,
        }
        let query = "mutation($username: String, $password: String) \
            { login(username: $username, password: $password) { access_token } }";
        let login: Login = self
            .execute(
                "login",
                query,
                json!({ "username": username, "password": password }),
            )
            .await?;
        Ok(login.access_token)
    }

    pub async fn add_post(
        &self,
        content: &str,
        tags: &[String],
        img_url: Option<&str>,
    ) -> Result<String, ClientError> {
        let query = "mutation($content: String, $tags: [String], $imgUrl: String) \
            { addPost(content: $content, tags: $tags, imgUrl: $imgUrl) }";
        self.execute(
            "addPost",
            query,
            json!({ "content": content, "tags": tags, "imgUrl": img_url }),
        )
        .await
    }

    pub async fn like_post(&self, post_id: &str) -> Result<String, ClientError> {
        let query = "mutation($id: ID) { likePost(postId: $id) }";
        self.execute("likePost", query, json!({ "id": post_id })).await
    }

    pub async fn comment_post(
        &self,
        post_id: &str,
        content: &str,
    ) -> Result<Vec<CommentView>, ClientError> {
        let query = "mutation($id: ID, $content: String) \
            { commentPost(postId: $id, content: $content) { content username createdAt updatedAt } }";
        self.execute("commentPost", query, json!({ "id": post_id, "content": content }))
            .await
    }

    pub async fn follow_user(&self, following_id: &str) -> Result<String, ClientError> {
        let query = "mutation($id: ID) { followUser(followingId: $id) }";
        self.execute("followUser", query, json!({ "id": following_id }))
            .await
    }
}
