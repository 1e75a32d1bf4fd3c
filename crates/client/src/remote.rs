//! Remote media service over [`WsClient`].
//!
//! Read operations go through the [`QueryCache`]; mutations invalidate the
//! keys they affect.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use mediashare_protocol::constants::{
    CACHE_KEY_CURRENT_PROFILE, CACHE_KEY_POSTS, MessageType, WS_ERR_CODE_NOT_FOUND,
};
use mediashare_protocol::envelope::Message;
use mediashare_protocol::messages::{
    AdminResponse, DeleteChunkRequest, FinalizeUploadRequest, PaginatedPostsRequest, PostRequest,
    PostResponse, PostsByAuthorRequest, PostsResponse, ProfileResponse, RoleResponse,
    SaveProfileRequest, SuccessResponse, UploadChunkHeader, UserProfileRequest,
};
use mediashare_protocol::{Post, PostId, Principal, UserProfile, UserRole};
use mediashare_uploader::{MediaService, ServiceError, ServiceFuture};

use crate::cache::{QueryCache, post_key, posts_page_key};
use crate::feed::{FeedFuture, PostFeed};
use crate::ws_client::{ClientError, WsClient};

/// Client-side handle to every operation the media service offers.
pub struct RemoteMediaService {
    client: Arc<WsClient>,
    cache: Arc<QueryCache>,
}

impl RemoteMediaService {
    pub fn new(client: Arc<WsClient>, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    pub fn client(&self) -> &Arc<WsClient> {
        &self.client
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// One page of the feed, newest first as ordered by the service.
    pub async fn get_paginated_posts(
        &self,
        start: u64,
        count: u64,
    ) -> Result<Vec<Post>, ClientError> {
        let key = posts_page_key(start, count);
        if let Some(posts) = self.cache.get(&key) {
            return Ok(posts);
        }

        let resp = self
            .client
            .send_request(
                MessageType::GetPaginatedPosts,
                Some(&PaginatedPostsRequest { start, count }),
            )
            .await?;
        let posts = payload::<PostsResponse>(&resp)?.posts;

        self.cache.insert(key, &posts);
        Ok(posts)
    }

    pub async fn get_post(&self, post_id: PostId) -> Result<Post, ClientError> {
        let key = post_key(post_id);
        if let Some(post) = self.cache.get(&key) {
            return Ok(post);
        }

        let resp = self
            .client
            .send_request(MessageType::GetPost, Some(&PostRequest { post_id }))
            .await
            .map_err(|e| match e {
                ClientError::Remote { code, .. } if code == WS_ERR_CODE_NOT_FOUND => {
                    ClientError::NotFound(post_id)
                }
                e => e,
            })?;
        let post = resp
            .parse_payload::<PostResponse>()?
            .ok_or(ClientError::NotFound(post_id))?
            .post;

        self.cache.insert(key, &post);
        Ok(post)
    }

    pub async fn get_posts_by_author(&self, author: &Principal) -> Result<Vec<Post>, ClientError> {
        let resp = self
            .client
            .send_request(
                MessageType::GetPostsByAuthor,
                Some(&PostsByAuthorRequest {
                    author: author.clone(),
                }),
            )
            .await?;
        Ok(payload::<PostsResponse>(&resp)?.posts)
    }

    /// Deletes a post. Feed pages and the post entry are invalidated once
    /// the service answers, whatever the outcome flag.
    pub async fn delete_post(&self, post_id: PostId) -> Result<bool, ClientError> {
        let resp = self
            .client
            .send_request(MessageType::DeletePost, Some(&PostRequest { post_id }))
            .await?;
        let success = payload::<SuccessResponse>(&resp)?.success;

        self.cache.invalidate_prefix(CACHE_KEY_POSTS);
        self.cache.invalidate_prefix(&post_key(post_id));
        debug!(post_id, success, "post deleted");
        Ok(success)
    }

    /// The caller's profile, `None` if they never saved one.
    pub async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, ClientError> {
        if let Some(profile) = self.cache.get(CACHE_KEY_CURRENT_PROFILE) {
            return Ok(profile);
        }

        let resp = self
            .client
            .send_request::<()>(MessageType::GetCallerUserProfile, None)
            .await?;
        let profile = resp
            .parse_payload::<ProfileResponse>()?
            .and_then(|r| r.profile);

        self.cache.insert(CACHE_KEY_CURRENT_PROFILE, &profile);
        Ok(profile)
    }

    pub async fn save_caller_user_profile(&self, profile: &UserProfile) -> Result<(), ClientError> {
        self.client
            .send_request(
                MessageType::SaveCallerUserProfile,
                Some(&SaveProfileRequest {
                    profile: profile.clone(),
                }),
            )
            .await?;
        self.cache.invalidate_prefix(CACHE_KEY_CURRENT_PROFILE);
        Ok(())
    }

    pub async fn get_user_profile(
        &self,
        user: &Principal,
    ) -> Result<Option<UserProfile>, ClientError> {
        let resp = self
            .client
            .send_request(
                MessageType::GetUserProfile,
                Some(&UserProfileRequest { user: user.clone() }),
            )
            .await?;
        Ok(resp
            .parse_payload::<ProfileResponse>()?
            .and_then(|r| r.profile))
    }

    pub async fn get_caller_user_role(&self) -> Result<UserRole, ClientError> {
        let resp = self
            .client
            .send_request::<()>(MessageType::GetCallerUserRole, None)
            .await?;
        Ok(payload::<RoleResponse>(&resp)?.role)
    }

    pub async fn is_caller_admin(&self) -> Result<bool, ClientError> {
        let resp = self
            .client
            .send_request::<()>(MessageType::IsCallerAdmin, None)
            .await?;
        Ok(payload::<AdminResponse>(&resp)?.is_admin)
    }
}

/// Parses a reply payload that must be present.
fn payload<T: DeserializeOwned>(resp: &Message) -> Result<T, ClientError> {
    resp.parse_payload::<T>()?.ok_or_else(|| {
        ClientError::UnexpectedResponse(format!("{:?} reply without payload", resp.msg_type))
    })
}

impl From<ClientError> for ServiceError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Timeout => ServiceError::Timeout,
            ClientError::Closed => ServiceError::Closed,
            ClientError::Remote { code, message } => ServiceError::Remote { code, message },
            ClientError::Json(e) => ServiceError::Json(e),
            ClientError::Ws(e) => ServiceError::Protocol(e.to_string()),
            ClientError::UnexpectedResponse(msg) => ServiceError::Protocol(msg),
            ClientError::NotFound(id) => ServiceError::Protocol(format!("post {id} not found")),
        }
    }
}

impl RemoteMediaService {
    /// Lost connections surface as [`ServiceError::Unavailable`] so the
    /// uploader stops instead of retrying against a dead socket.
    fn service_error(&self, e: ClientError) -> ServiceError {
        match e {
            ClientError::Closed | ClientError::Timeout | ClientError::Ws(_)
                if !self.client.is_connected() =>
            {
                ServiceError::Unavailable
            }
            e => e.into(),
        }
    }
}

impl MediaService for RemoteMediaService {
    fn upload_media_chunk<'a>(
        &'a self,
        session_id: PostId,
        total_size: u64,
        chunk_index: u64,
        data: &'a [u8],
    ) -> ServiceFuture<'a, bool> {
        Box::pin(async move {
            let header =
                serde_json::to_value(UploadChunkHeader::new(session_id, total_size, chunk_index))?;
            let resp = self
                .client
                .send_binary(&header, data)
                .await
                .map_err(|e| self.service_error(e))?;
            Ok(payload::<SuccessResponse>(&resp)?.success)
        })
    }

    fn finalize_upload(&self, session_id: PostId) -> ServiceFuture<'_, bool> {
        Box::pin(async move {
            let resp = self
                .client
                .send_request(
                    MessageType::FinalizeUpload,
                    Some(&FinalizeUploadRequest { session_id }),
                )
                .await
                .map_err(|e| self.service_error(e))?;
            Ok(payload::<SuccessResponse>(&resp)?.success)
        })
    }

    fn delete_chunk(&self, session_id: PostId) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.client
                .send_request(
                    MessageType::DeleteChunk,
                    Some(&DeleteChunkRequest { session_id }),
                )
                .await
                .map_err(|e| self.service_error(e))?;
            Ok(())
        })
    }

    fn is_available(&self) -> bool {
        self.client.is_connected()
    }
}

impl PostFeed for RemoteMediaService {
    fn fetch_page(&self, start: u64, count: u64) -> FeedFuture<'_> {
        Box::pin(self.get_paginated_posts(start, count))
    }
}
