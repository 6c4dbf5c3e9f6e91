use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use shared::Attachment;

/// Text fragments in arrival order. An `Err` item ends the response.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// A hosted text model that answers one prompt with a stream of fragments.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, for logs.
    fn name(&self) -> &str;

    /// Issue one streaming request. Errors before the first fragment (bad
    /// key, HTTP status) are returned here; later ones arrive in the stream.
    async fn stream(&self, prompt: &str, attachments: &[Attachment]) -> Result<FragmentStream>;
}

/// Concatenate every fragment. Zero fragments yields an empty string.
pub async fn collect_response(mut fragments: FragmentStream) -> Result<String> {
    let mut text = String::new();
    while let Some(fragment) = fragments.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

/// One call, no retry: build the request, stream it, accumulate the answer.
pub async fn send(
    model: &dyn GenerativeModel,
    prompt: &str,
    attachments: &[Attachment],
) -> Result<String> {
    let fragments = model.stream(prompt, attachments).await?;
    let text = collect_response(fragments).await?;
    tracing::debug!(model = model.name(), chars = text.len(), "response complete");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use futures::stream;

    struct Scripted(Vec<&'static str>);

    #[async_trait]
    impl GenerativeModel for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn stream(&self, _prompt: &str, _attachments: &[Attachment]) -> Result<FragmentStream> {
            let items: Vec<Result<String>> = self.0.iter().map(|s| Ok(s.to_string())).collect();
            Ok(stream::iter(items).boxed())
        }
    }

    #[tokio::test]
    async fn test_fragments_joined_in_order() {
        let model = Scripted(vec!["Hel", "lo ", "**world**"]);
        let text = send(&model, "hi", &[]).await.unwrap();
        assert_eq!(text, "Hello **world**");
    }

    #[tokio::test]
    async fn test_empty_stream_is_empty_string() {
        let model = Scripted(vec![]);
        assert_eq!(send(&model, "hi", &[]).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_mid_stream_error_propagates() {
        let items: Vec<Result<String>> = vec![Ok("partial".into()), Err(anyhow!("connection reset"))];
        let err = collect_response(stream::iter(items).boxed()).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
