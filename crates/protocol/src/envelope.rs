//! JSON envelope shared by every text frame exchanged with the media
//! service. Chunk uploads travel as binary frames and only their reply uses
//! this envelope.

use serde::{Deserialize, Serialize};

use crate::constants::{MessageType, WS_ERR_CODE_UNAUTHORIZED};

/// Failure reported by the media service in place of a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsError {
    pub code: i32,
    pub message: String,
}

impl WsError {
    /// The caller lacks the role the operation needs (anonymous callers
    /// cannot upload or delete).
    pub fn is_unauthorized(&self) -> bool {
        self.code == WS_ERR_CODE_UNAUTHORIZED
    }
}

/// A request to, or reply from, the media service.
///
/// Replies carry the id of the request they answer. The payload stays raw
/// until the caller that issued the request parses it into the type it
/// expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WsError>,
}

impl Message {
    /// Creates a new message with the given type and payload.
    pub fn new<T: Serialize>(
        id: impl Into<String>,
        msg_type: MessageType,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        let raw = match payload {
            Some(p) => {
                let json = serde_json::to_string(p)?;
                Some(serde_json::value::RawValue::from_string(json)?)
            }
            None => None,
        };
        Ok(Self {
            id: id.into(),
            msg_type,
            payload: raw,
            error: None,
        })
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.payload {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }

    /// Splits a reply into its payload-bearing message or the service error.
    pub fn into_result(self) -> Result<Self, WsError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    /// Builds the reply to this request, keeping its id.
    pub fn reply<T: Serialize>(
        &self,
        msg_type: MessageType,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        Message::new(&self.id, msg_type, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::PostResponse;
    use crate::types::{Post, Principal};

    #[test]
    fn message_new_without_payload() {
        let msg = Message::new::<()>("msg-2", MessageType::IsCallerAdmin, None).unwrap();
        assert!(msg.payload.is_none());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("payload"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn error_reply_becomes_err() {
        let json = r#"{"id":"msg-3","type":"error","error":{"code":404,"message":"post not found"}}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.msg_type, MessageType::Error);

        let err = msg.into_result().unwrap_err();
        assert_eq!(err.code, 404);
        assert!(!err.is_unauthorized());
        assert_eq!(err.message, "post not found");
    }

    #[test]
    fn unauthorized_code() {
        let err = WsError {
            code: 401,
            message: "anonymous caller".into(),
        };
        assert!(err.is_unauthorized());
    }

    #[test]
    fn plain_reply_is_ok() {
        let body = serde_json::json!({"success": true});
        let msg = Message::new("m2", MessageType::OperationResult, Some(&body)).unwrap();
        let msg = msg.into_result().unwrap();
        assert_eq!(msg.id, "m2");
    }

    #[test]
    fn message_parse_payload() {
        let post = Post {
            id: 7,
            media: vec![0xff, 0xd8, 0xff],
            author: Principal::new("aaaaa-aa"),
            is_finalized: true,
        };
        let resp = PostResponse { post: post.clone() };
        let msg = Message::new("m1", MessageType::PostResponse, Some(&resp)).unwrap();
        let parsed: Option<PostResponse> = msg.parse_payload().unwrap();
        assert_eq!(parsed.unwrap().post, post);
    }

    #[test]
    fn reply_preserves_id() {
        let original = Message::new::<()>("req-42", MessageType::FinalizeUpload, None).unwrap();
        let reply = original
            .reply(MessageType::UploadFinalized, Some(&serde_json::json!({"success": true})))
            .unwrap();
        assert_eq!(reply.id, "req-42");
        assert_eq!(reply.msg_type, MessageType::UploadFinalized);
    }
}
