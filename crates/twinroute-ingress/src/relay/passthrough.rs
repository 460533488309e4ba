//! Same-protocol relay

use super::FrameStream;
use async_stream::stream;
use bytes::BytesMut;
use futures::StreamExt;
use tracing::warn;
use twinroute_core::provider::ByteStream;

/// Forward the upstream body line by line, byte-for-byte.
///
/// Each yielded item is one line including its `\n`, so blank separators and
/// the `[DONE]` sentinel reach the caller as soon as they are complete.
pub fn passthrough(mut body: ByteStream) -> FrameStream {
    Box::pin(stream! {
        let mut buffer = BytesMut::new();
        // Bytes of `buffer` already known to hold no newline
        let mut scanned = 0;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Upstream stream failed during passthrough: {}", e);
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer[scanned..].iter().position(|b| *b == b'\n') {
                yield buffer.split_to(scanned + pos + 1).freeze();
                scanned = 0;
            }
            scanned = buffer.len();
        }

        if !buffer.is_empty() {
            yield buffer.freeze();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn body(parts: &[&'static str]) -> ByteStream {
        let items: Vec<twinroute_core::Result<Bytes>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        Box::pin(futures::stream::iter(items))
    }

    async fn collect(stream: FrameStream) -> Vec<String> {
        stream
            .map(|frame| String::from_utf8(frame.to_vec()).unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_lines_are_split_and_verbatim() {
        let frames = collect(passthrough(body(&[
            "data: {\"a\":1}\n\nda",
            "ta: [DONE]\n\n",
        ])))
        .await;

        assert_eq!(
            frames,
            vec!["data: {\"a\":1}\n", "\n", "data: [DONE]\n", "\n"]
        );
    }

    #[tokio::test]
    async fn test_trailing_partial_line_is_flushed() {
        let frames = collect(passthrough(body(&["event: ping\ndata: {}"]))).await;
        assert_eq!(frames, vec!["event: ping\n", "data: {}"]);
    }

    #[tokio::test]
    async fn test_read_error_ends_stream() {
        let items: Vec<twinroute_core::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: 1\n")),
            Err(twinroute_core::Error::Stream("reset".into())),
            Ok(Bytes::from_static(b"data: 2\n")),
        ];
        let frames = collect(passthrough(Box::pin(futures::stream::iter(items)))).await;
        assert_eq!(frames, vec!["data: 1\n"]);
    }

    #[tokio::test]
    async fn test_long_line_across_many_chunks() {
        let mut parts = vec!["data: "];
        parts.extend(std::iter::repeat_n("x", 5000));
        parts.push("\n\ndata: [DONE]\n");
        let frames = collect(passthrough(body(&parts))).await;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].len(), "data: ".len() + 5000 + 1);
        assert!(frames[0].starts_with("data: xxx"));
        assert!(frames[0].ends_with("x\n"));
        assert_eq!(frames[1], "\n");
        assert_eq!(frames[2], "data: [DONE]\n");
    }
}
