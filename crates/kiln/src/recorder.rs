use crate::classify::PageType;
use crate::error::KilnError;
use crate::page::Dependencies;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Output,
    QueryType,
    QueryAnchors,
    QueryDeps,
}

impl RenderMode {
    pub fn name(self) -> &'static str {
        match self {
            RenderMode::Output => "output",
            RenderMode::QueryType => "query_type",
            RenderMode::QueryAnchors => "query_anchors",
            RenderMode::QueryDeps => "query_deps",
        }
    }

    pub fn is_query(self) -> bool {
        self != RenderMode::Output
    }
}

#[derive(Debug, Default)]
pub struct Recording {
    pub srcdeps: BTreeSet<String>,
    pub rtdeps: BTreeSet<String>,
    pub anchors: BTreeSet<String>,
    pub page_type: Option<PageType>,
    failure: Option<KilnError>,
}

impl Recording {
    pub fn dependencies(&self) -> Dependencies {
        Dependencies {
            srcdeps: self.srcdeps.clone(),
            rtdeps: self.rtdeps.clone(),
        }
    }
}

/// Collects what a single template evaluation touches.
///
/// Cloned into every template function of that evaluation; all clones share
/// one recording.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Recording>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_srcdep(&self, source: impl Into<String>) {
        self.0.lock().srcdeps.insert(source.into());
    }

    pub fn add_rtdep(&self, build: impl Into<String>) {
        self.0.lock().rtdeps.insert(build.into());
    }

    pub fn add_anchor(&self, anchor: impl Into<String>) {
        self.0.lock().anchors.insert(anchor.into());
    }

    /// Records the declared type and returns the one declared before it, if any.
    pub fn declare_type(&self, page_type: PageType) -> Option<PageType> {
        self.0.lock().page_type.replace(page_type)
    }

    /// Keeps the first failure so it can be returned as-is once Tera unwinds.
    pub fn fail(&self, error: KilnError) -> tera::Error {
        let message = error.to_string();
        let mut recording = self.0.lock();
        if recording.failure.is_none() {
            recording.failure = Some(error);
        }
        tera::Error::msg(message)
    }

    pub fn take_failure(&self) -> Option<KilnError> {
        self.0.lock().failure.take()
    }

    pub fn finish(&self) -> Recording {
        std::mem::take(&mut *self.0.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_recording() {
        let recorder = Recorder::new();
        let clone = recorder.clone();

        recorder.add_srcdep("a.html");
        clone.add_srcdep("a.html");
        clone.add_rtdep("build/b.png");
        clone.add_anchor("intro");

        let recording = recorder.finish();
        assert_eq!(recording.srcdeps.len(), 1);
        assert!(recording.rtdeps.contains("build/b.png"));
        assert!(recording.anchors.contains("intro"));
    }

    #[test]
    fn test_first_failure_is_kept() {
        let recorder = Recorder::new();
        let _ = recorder.fail(KilnError::NotFound {
            key: "first".to_string(),
        });
        let _ = recorder.fail(KilnError::NotFound {
            key: "second".to_string(),
        });

        match recorder.take_failure() {
            Some(KilnError::NotFound { key }) => assert_eq!(key, "first"),
            other => panic!("unexpected failure: {other:?}"),
        }
        assert!(recorder.take_failure().is_none());
    }

    #[test]
    fn test_declare_type_returns_previous() {
        let recorder = Recorder::new();
        assert_eq!(recorder.declare_type(PageType::BlogEntry), None);
        assert_eq!(
            recorder.declare_type(PageType::Home),
            Some(PageType::BlogEntry)
        );
    }

    #[test]
    fn test_query_modes() {
        assert!(!RenderMode::Output.is_query());
        assert!(RenderMode::QueryDeps.is_query());
        assert_eq!(RenderMode::QueryAnchors.name(), "query_anchors");
    }
}
