use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use super::{FollowStore, PostStore, UserStore};
use crate::follows::repo_types::FollowOutcome;
use crate::posts::repo_types::{Comment, Like, LikeOutcome, NewPost, Post};
use crate::users::repo_types::{NewUser, PublicUser, User, UserFilter, UserNetwork};

const USER_COLUMNS: &str = "id, name, username, email, password, created_at, updated_at";

// posts LEFT JOIN users; the author's password never leaves the database
const POST_SELECT: &str = r#"
    SELECT p.id, p.content, p.tags, p.img_url, p.author_id, p.likes, p.comments,
           p.created_at, p.updated_at,
           u.id AS author_user_id, u.name AS author_name,
           u.username AS author_username, u.email AS author_email
      FROM posts p
      LEFT JOIN users u ON u.id = p.author_id
"#;

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    content: String,
    tags: Vec<String>,
    img_url: Option<String>,
    author_id: Uuid,
    likes: Json<Vec<Like>>,
    comments: Json<Vec<Comment>>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    author_user_id: Option<Uuid>,
    author_name: Option<String>,
    author_username: Option<String>,
    author_email: Option<String>,
}

impl From<PostRow> for Post {
    fn from(r: PostRow) -> Self {
        let author = match (r.author_user_id, r.author_username, r.author_email) {
            (Some(id), Some(username), Some(email)) => Some(PublicUser {
                id,
                name: r.author_name,
                username,
                email,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            content: r.content,
            tags: r.tags,
            img_url: r.img_url,
            author_id: r.author_id,
            author,
            likes: r.likes.0,
            comments: r.comments.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self::new(db))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    async fn load_public_users(&self, sql: &str, id: Uuid) -> anyhow::Result<Vec<PublicUser>> {
        let users = sqlx::query_as::<_, User>(sql)
            .bind(id)
            .fetch_all(&self.db)
            .await?;
        Ok(users.iter().map(PublicUser::from).collect())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, username, email, password)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.name)
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn user_exists(&self, username: &str, email: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.db)
        .await
        .context("check user exists")?;
        Ok(exists)
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn search_users(&self, filter: &UserFilter) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE ($1::text IS NULL AND $2::text IS NULL)
                OR strpos(lower(coalesce(name, '')), lower($1)) > 0
                OR strpos(lower(username), lower($2)) > 0
             ORDER BY created_at ASC
            "#
        ))
        .bind(filter.name.as_deref())
        .bind(filter.username.as_deref())
        .fetch_all(&self.db)
        .await
        .context("search users")?;
        Ok(users)
    }

    async fn user_network(&self, id: Uuid) -> anyhow::Result<Option<UserNetwork>> {
        let Some(user) = self.find_user_by_id(id).await? else {
            return Ok(None);
        };
        let followers = self
            .load_public_users(
                r#"
                SELECT u.id, u.name, u.username, u.email, u.password, u.created_at, u.updated_at
                  FROM follows f
                  JOIN users u ON u.id = f.follower_id
                 WHERE f.following_id = $1
                 ORDER BY f.created_at ASC
                "#,
                id,
            )
            .await
            .context("load followers")?;
        let followings = self
            .load_public_users(
                r#"
                SELECT u.id, u.name, u.username, u.email, u.password, u.created_at, u.updated_at
                  FROM follows f
                  JOIN users u ON u.id = f.following_id
                 WHERE f.follower_id = $1
                 ORDER BY f.created_at ASC
                "#,
                id,
            )
            .await
            .context("load followings")?;
        Ok(Some(UserNetwork {
            user: PublicUser::from(&user),
            followers,
            followings,
        }))
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post(&self, new: NewPost) -> anyhow::Result<Option<Post>> {
        // posts_content_key turns duplicate content into a no-op insert
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO posts (id, content, tags, img_url, author_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.content)
        .bind(&new.tags)
        .bind(&new.img_url)
        .bind(new.author_id)
        .fetch_optional(&self.db)
        .await
        .context("insert post")?;

        match id {
            Some(id) => self.find_post(id).await,
            None => Ok(None),
        }
    }

    async fn list_posts(&self) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_SELECT} ORDER BY p.created_at DESC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list posts")?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn list_posts_by_author(&self, author_id: Uuid) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_SELECT} WHERE p.author_id = $1 ORDER BY p.created_at DESC"
        ))
        .bind(author_id)
        .fetch_all(&self.db)
        .await
        .context("list posts by author")?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn find_post(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find post")?;
        Ok(row.map(Post::from))
    }

    async fn toggle_like(
        &self,
        post_id: Uuid,
        username: &str,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<LikeOutcome>> {
        let stamp = at.format(&Rfc3339).context("format like timestamp")?;
        // Single statement: the row lock taken by UPDATE serializes concurrent
        // toggles on the same post, and RETURNING reads the post-update array.
        let liked = sqlx::query_scalar::<_, bool>(
            r#"
            UPDATE posts
               SET likes = CASE
                     WHEN EXISTS (SELECT 1 FROM jsonb_array_elements(likes) l
                                   WHERE l->>'username' = $2)
                     THEN (SELECT coalesce(jsonb_agg(l.value ORDER BY l.ord), '[]'::jsonb)
                             FROM jsonb_array_elements(likes) WITH ORDINALITY AS l(value, ord)
                            WHERE l.value->>'username' <> $2)
                     ELSE likes || jsonb_build_array(jsonb_build_object(
                            'username', $2::text, 'createdAt', $3::text, 'updatedAt', $3::text))
                   END,
                   updated_at = $4
             WHERE id = $1
            RETURNING EXISTS (SELECT 1 FROM jsonb_array_elements(likes) l
                               WHERE l->>'username' = $2)
            "#,
        )
        .bind(post_id)
        .bind(username)
        .bind(stamp)
        .bind(at)
        .fetch_optional(&self.db)
        .await
        .context("toggle like")?;

        Ok(liked.map(|now_liked| {
            if now_liked {
                LikeOutcome::Liked
            } else {
                LikeOutcome::Unliked
            }
        }))
    }

    async fn append_comment(
        &self,
        post_id: Uuid,
        comment: Comment,
    ) -> anyhow::Result<Option<Vec<Comment>>> {
        let updated_at = comment.updated_at;
        let comments = sqlx::query_scalar::<_, Json<Vec<Comment>>>(
            r#"
            UPDATE posts
               SET comments = comments || jsonb_build_array($2::jsonb),
                   updated_at = $3
             WHERE id = $1
            RETURNING comments
            "#,
        )
        .bind(post_id)
        .bind(Json(comment))
        .bind(updated_at)
        .fetch_optional(&self.db)
        .await
        .context("append comment")?;
        Ok(comments.map(|c| c.0))
    }
}

#[async_trait]
impl FollowStore for PgStore {
    async fn toggle_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> anyhow::Result<FollowOutcome> {
        let mut tx = self.db.begin().await.context("begin follow toggle")?;

        // serializes toggles on the same pair until commit
        sqlx::query(
            "SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text || ':' || $2::uuid::text, 0))",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await
        .context("lock follow pair")?;

        let removed = sqlx::query(
            "DELETE FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await
        .context("delete follow")?
        .rows_affected()
            > 0;

        if !removed {
            sqlx::query(
                r#"
                INSERT INTO follows (id, follower_id, following_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (follower_id, following_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(follower_id)
            .bind(following_id)
            .execute(&mut *tx)
            .await
            .context("insert follow")?;
        }

        tx.commit().await.context("commit follow toggle")?;

        Ok(if removed {
            FollowOutcome::Unfollowed
        } else {
            FollowOutcome::Followed
        })
    }
}
