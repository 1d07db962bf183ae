use crate::server::ServerError;
use axum::extract::{FromRequest, Multipart, Request};
use snsserver_common::model::post::PostContent;
use snsserver_service::uploads::UploadedFile;
use tracing::debug;

/// `multipart/form-data` body of a create or update request: text fields `title` and
/// `content`, plus an optional file field `file`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PostForm {
    pub content: PostContent,
    pub file: Option<UploadedFile>,
}

impl<S> FromRequest<S> for PostForm
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(request, state).await?;

        let mut title = None;
        let mut content = None;
        let mut file = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("title") => title = Some(field.text().await?),
                Some("content") => content = Some(field.text().await?),
                Some("file") => {
                    let original_filename = field.file_name().unwrap_or_default().to_owned();
                    let bytes = field.bytes().await?.to_vec();
                    file = Some(UploadedFile {
                        original_filename,
                        bytes,
                    });
                }
                other => debug!(name = ?other, "Ignoring unknown form field"),
            }
        }

        Ok(Self {
            content: PostContent {
                title: title.ok_or(ServerError::MissingFormField("title"))?,
                content: content.ok_or(ServerError::MissingFormField("content"))?,
            },
            file,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ServerError, form::PostForm};
    use axum::{
        body::Body,
        extract::{FromRequest, Request},
        http::header::CONTENT_TYPE,
    };

    fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request {
        let mut body = String::new();
        for (name, filename, value) in parts {
            body.push_str("--BOUNDARY\r\n");
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str("--BOUNDARY--\r\n");

        Request::builder()
            .method("POST")
            .uri("/posts")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn parses_fields_and_file() {
        let request = multipart_request(&[
            ("title", None, "Hello"),
            ("content", None, "World"),
            ("file", Some("cat.png"), "meow"),
        ]);

        let form = PostForm::from_request(request, &()).await.unwrap();

        assert_eq!(form.content.title, "Hello");
        assert_eq!(form.content.content, "World");
        let file = form.file.unwrap();
        assert_eq!(file.original_filename, "cat.png");
        assert_eq!(file.bytes, b"meow");
    }

    #[tokio::test]
    async fn file_is_optional() {
        let request = multipart_request(&[("title", None, "Hello"), ("content", None, "World")]);

        let form = PostForm::from_request(request, &()).await.unwrap();

        assert_eq!(form.file, None);
    }

    #[tokio::test]
    async fn empty_file_is_passed_through() {
        let request = multipart_request(&[
            ("title", None, "Hello"),
            ("content", None, "World"),
            ("file", Some("empty.txt"), ""),
        ]);

        let form = PostForm::from_request(request, &()).await.unwrap();

        assert!(form.file.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_title_is_rejected() {
        let request = multipart_request(&[("content", None, "World")]);

        let result = PostForm::from_request(request, &()).await;

        assert!(matches!(result, Err(ServerError::MissingFormField("title"))));
    }
}
