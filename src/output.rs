//! Result printing.

use futures::{Stream, StreamExt};
use miette::IntoDiagnostic;
use std::io::Write;
use std::pin::pin;
use ziptrawl_pipeline::error::Error as PipelineError;
use ziptrawl_pipeline::{Event, Match, Stats};

/// Characters of entry content shown under each match.
const PREVIEW_CHARS: usize = 60;

/// What a search printed before it stopped.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub printed: usize,
    /// Whether printing stopped because the limit was hit.
    pub limit_reached: bool,
    /// Only present if the run reached its end.
    pub stats: Option<Stats>,
}

/// Archive path, then the entry name and the start of its content, indented.
pub fn write_match(out: &mut impl Write, found: &Match) -> std::io::Result<()> {
    let preview: String = found
        .content
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .take(PREVIEW_CHARS)
        .collect();
    writeln!(out, "{}", found.path)?;
    writeln!(out, "\t{}", found.entry)?;
    writeln!(out, "\tBegins with: {preview}...")
}

/// Prints matches until the stream ends or `limit` matches (0 for no limit)
/// have been printed. The stream is dropped as soon as the last allowed
/// match is out, so no further archive is fetched, and the remote session
/// is released.
pub async fn print_events<S>(events: S, limit: usize, out: &mut impl Write) -> miette::Result<Summary>
where
    S: Stream<Item = Result<Event, PipelineError>>,
{
    let mut events = pin!(events);
    let mut summary = Summary::default();
    while let Some(event) = events.next().await {
        match event.map_err(crate::report)? {
            Event::Match(found) => {
                write_match(out, &found).into_diagnostic()?;
                summary.printed += 1;
                if limit != 0 && summary.printed == limit {
                    summary.limit_reached = true;
                    break;
                }
            },
            // Already logged by the pipeline.
            Event::ArchiveSkipped { .. } | Event::EntrySkipped { .. } => {},
            Event::Finished(stats) => summary.stats = Some(stats),
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(content: &str) -> Match {
        Match {
            path: "/a/20180101aa_20180131bb_1.xml.zip".to_string(),
            entry: "x.xml".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_write_match_previews_sixty_characters() {
        let mut out = Vec::new();
        let content = format!("<a>\r\n{}</a>", "Я".repeat(100));
        write_match(&mut out, &found(&content)).unwrap();
        let expected = format!(
            "/a/20180101aa_20180131bb_1.xml.zip\n\tx.xml\n\tBegins with: <a>{}...\n",
            "Я".repeat(57)
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_limit_stops_the_stream() {
        let events = futures::stream::iter(vec![
            Ok(Event::Match(found("one"))),
            Ok(Event::ArchiveSkipped {
                path: "/a/broken.zip".to_string(),
                reason: "not a readable archive".to_string(),
            }),
            Ok(Event::Match(found("two"))),
            Ok(Event::Match(found("three"))),
            Ok(Event::Finished(Stats::default())),
        ]);
        let mut out = Vec::new();
        let summary = print_events(events, 2, &mut out).await.unwrap();
        assert_eq!(
            summary,
            Summary {
                printed: 2,
                limit_reached: true,
                stats: None,
            }
        );
        assert!(!String::from_utf8(out).unwrap().contains("three"));
    }

    #[tokio::test]
    async fn test_stream_is_not_polled_past_the_limit() {
        let polled = std::sync::atomic::AtomicUsize::new(0);
        let events = futures::stream::iter(["one", "two", "three"]).map(|content| {
            polled.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Event::Match(found(content)))
        });
        let summary = print_events(events, 1, &mut Vec::new()).await.unwrap();
        assert_eq!(summary.printed, 1);
        assert!(summary.limit_reached);
        assert_eq!(polled.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fewer_matches_than_limit_runs_to_the_end() {
        let stats = Stats {
            visited: 1,
            matches: 1,
            ..Stats::default()
        };
        let events = futures::stream::iter(vec![Ok(Event::Match(found("one"))), Ok(Event::Finished(stats))]);
        let summary = print_events(events, 2, &mut Vec::new()).await.unwrap();
        assert!(!summary.limit_reached);
        assert_eq!(summary.stats, Some(stats));
    }

    #[tokio::test]
    async fn test_zero_means_unlimited() {
        let events = futures::stream::iter((0..150).map(|i| Ok(Event::Match(found(&i.to_string())))));
        let summary = print_events(events, 0, &mut Vec::new()).await.unwrap();
        assert_eq!(summary.printed, 150);
    }
}
