//! REST client for the board application.
//!
//! Routes (relative to `base_url`):
//!
//! | call                  | request                                        |
//! |-----------------------|------------------------------------------------|
//! | get_card              | `GET    /cards/{card}`                         |
//! | move_card             | `POST   /cards/{card}/move` `{listId}`         |
//! | board_members         | `GET    /boards/{board}/members`               |
//! | assign_member         | `POST   /cards/{card}/members` `{userId}`      |
//! | unassign_member       | `DELETE /cards/{card}/members/{user}`          |
//! | board_labels          | `GET    /boards/{board}/labels`                |
//! | create_label          | `POST   /boards/{board}/labels` `{name,color}` |
//! | attach_label          | `POST   /cards/{card}/labels` `{labelId}`      |
//! | detach_label          | `DELETE /cards/{card}/labels/{label}`          |
//! | add_comment           | `POST   /cards/{card}/comments`                |
//! | set_due_date / archive| `PATCH  /cards/{card}`                         |
//! | copy_card             | `POST   /cards/{card}/copy` `{listId,title}`   |
//! | create_checklist      | `POST   /cards/{card}/checklists`              |
//! | complete_checklists   | `POST   /cards/{card}/checklists/complete`     |
//! | notify                | `POST   /notifications`                        |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{BoardError, BoardList, BoardService, Card, Checklist, Label, Member, Notification, Notifier};

pub struct HttpBoardClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBoardClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BoardError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BoardError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn dispatch(
        &self,
        request: RequestBuilder,
        kind: &'static str,
        id: &str,
    ) -> Result<reqwest::Response, BoardError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| BoardError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(%status, kind, id, "board api response");

        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(BoardError::not_found(kind, id));
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(BoardError::Rejected(format!("{status}: {body}")))
        } else {
            Err(BoardError::Unavailable(format!("{status}: {body}")))
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        kind: &'static str,
        id: &str,
    ) -> Result<T, BoardError> {
        self.dispatch(request, kind, id)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BoardError::Unavailable(format!("malformed board response: {e}")))
    }
}

#[derive(Deserialize)]
struct CompletedChecklists {
    completed: usize,
}

#[async_trait]
impl BoardService for HttpBoardClient {
    async fn get_card(&self, card_id: &str) -> Result<Card, BoardError> {
        let req = self.client.get(self.url(&format!("/cards/{card_id}")));
        self.fetch(req, "card", card_id).await
    }

    async fn move_card(&self, card_id: &str, list_id: &str) -> Result<BoardList, BoardError> {
        let req = self
            .client
            .post(self.url(&format!("/cards/{card_id}/move")))
            .json(&json!({ "listId": list_id, "position": "end" }));
        self.fetch(req, "card", card_id).await
    }

    async fn board_members(&self, board_id: &str) -> Result<Vec<Member>, BoardError> {
        let req = self.client.get(self.url(&format!("/boards/{board_id}/members")));
        self.fetch(req, "board", board_id).await
    }

    async fn assign_member(&self, card_id: &str, user_id: &str) -> Result<(), BoardError> {
        let req = self
            .client
            .post(self.url(&format!("/cards/{card_id}/members")))
            .json(&json!({ "userId": user_id }));
        self.dispatch(req, "card", card_id).await.map(|_| ())
    }

    async fn unassign_member(&self, card_id: &str, user_id: &str) -> Result<(), BoardError> {
        let req = self
            .client
            .delete(self.url(&format!("/cards/{card_id}/members/{user_id}")));
        self.dispatch(req, "card", card_id).await.map(|_| ())
    }

    async fn board_labels(&self, board_id: &str) -> Result<Vec<Label>, BoardError> {
        let req = self.client.get(self.url(&format!("/boards/{board_id}/labels")));
        self.fetch(req, "board", board_id).await
    }

    async fn create_label(
        &self,
        board_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> Result<Label, BoardError> {
        let req = self
            .client
            .post(self.url(&format!("/boards/{board_id}/labels")))
            .json(&json!({ "name": name, "color": color }));
        self.fetch(req, "board", board_id).await
    }

    async fn attach_label(&self, card_id: &str, label_id: &str) -> Result<(), BoardError> {
        let req = self
            .client
            .post(self.url(&format!("/cards/{card_id}/labels")))
            .json(&json!({ "labelId": label_id }));
        self.dispatch(req, "card", card_id).await.map(|_| ())
    }

    async fn detach_label(&self, card_id: &str, label_id: &str) -> Result<(), BoardError> {
        let req = self
            .client
            .delete(self.url(&format!("/cards/{card_id}/labels/{label_id}")));
        self.dispatch(req, "card", card_id).await.map(|_| ())
    }

    async fn add_comment(
        &self,
        card_id: &str,
        author_id: Option<&str>,
        content: &str,
    ) -> Result<(), BoardError> {
        let req = self
            .client
            .post(self.url(&format!("/cards/{card_id}/comments")))
            .json(&json!({ "authorId": author_id, "content": content }));
        self.dispatch(req, "card", card_id).await.map(|_| ())
    }

    async fn set_due_date(&self, card_id: &str, due: DateTime<Utc>) -> Result<(), BoardError> {
        let req = self
            .client
            .patch(self.url(&format!("/cards/{card_id}")))
            .json(&json!({ "dueDate": due }));
        self.dispatch(req, "card", card_id).await.map(|_| ())
    }

    async fn archive_card(&self, card_id: &str) -> Result<(), BoardError> {
        let req = self
            .client
            .patch(self.url(&format!("/cards/{card_id}")))
            .json(&json!({ "archived": true }));
        self.dispatch(req, "card", card_id).await.map(|_| ())
    }

    async fn copy_card(
        &self,
        card_id: &str,
        list_id: &str,
        title: &str,
    ) -> Result<Card, BoardError> {
        let req = self
            .client
            .post(self.url(&format!("/cards/{card_id}/copy")))
            .json(&json!({ "listId": list_id, "title": title }));
        self.fetch(req, "card", card_id).await
    }

    async fn create_checklist(
        &self,
        card_id: &str,
        name: &str,
        items: &[String],
    ) -> Result<Checklist, BoardError> {
        let req = self
            .client
            .post(self.url(&format!("/cards/{card_id}/checklists")))
            .json(&json!({ "name": name, "items": items }));
        self.fetch(req, "card", card_id).await
    }

    async fn complete_checklists(
        &self,
        card_id: &str,
        name: Option<&str>,
    ) -> Result<usize, BoardError> {
        let req = self
            .client
            .post(self.url(&format!("/cards/{card_id}/checklists/complete")))
            .json(&json!({ "name": name }));
        let body: CompletedChecklists = self.fetch(req, "card", card_id).await?;
        Ok(body.completed)
    }
}

#[async_trait]
impl Notifier for HttpBoardClient {
    async fn notify(&self, notification: &Notification) -> Result<(), BoardError> {
        let req = self.client.post(self.url("/notifications")).json(notification);
        self.dispatch(req, "user", &notification.user_id)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpBoardClient {
        HttpBoardClient::new(server.uri(), Some("t0k".into()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn move_card_posts_target_list_and_parses_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cards/c1/move"))
            .and(header("authorization", "Bearer t0k"))
            .and(body_json(json!({ "listId": "done", "position": "end" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "done", "name": "Done" })))
            .expect(1)
            .mount(&server)
            .await;

        let list = client(&server).move_card("c1", "done").await.unwrap();
        assert_eq!(list.name, "Done");
    }

    #[tokio::test]
    async fn status_codes_map_to_board_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/cards/locked"))
            .respond_with(ResponseTemplate::new(403).set_body_string("read only"))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/cards/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let c = client(&server);
        assert_eq!(
            c.get_card("missing").await.unwrap_err(),
            BoardError::not_found("card", "missing")
        );
        assert!(matches!(c.archive_card("locked").await, Err(BoardError::Rejected(_))));
        assert!(matches!(c.archive_card("flaky").await, Err(BoardError::Unavailable(_))));
    }
}
