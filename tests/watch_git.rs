mod support;

use std::cell::RefCell;
use std::rc::Rc;

use forkwatch::watch::notify::NotifyError;
use forkwatch::watch::{ProbeError, RemoteProbe};
use forkwatch::{NotificationSink, RemoteSet, UpstreamAdvance, WatchTarget, Watcher};
use support::*;

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<UpstreamAdvance>>>);

impl NotificationSink for Recorder {
    fn deliver(&self, event: &UpstreamAdvance) -> Result<(), NotifyError> {
        self.0.borrow_mut().push(event.clone());
        Ok(())
    }
}

#[test]
fn test_watch_notifies_once_per_upstream_advance() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let upstream = bare_upstream(td.path());
    let repo = td.path().join("widget");
    clone_fork(&upstream, &repo, "https://example.com/alice/widget.git");
    let scratch = td.path().join("scratch");

    let o = oracle(true);
    let h = handle(&repo);
    let remotes = o.remotes(&h);
    let target = WatchTarget::from_remotes(h, &remotes);
    assert_eq!(target.upstream_url, upstream.to_string_lossy());

    let sink = Recorder::default();
    let mut w = Watcher::new(vec![target], o, sink.clone());

    // Nothing new upstream: first observation records the identity silently.
    let c1 = w.poll_once();
    assert!(c1.all_checked());
    assert!(c1.notified.is_empty());
    let seen = w.targets()[0].last_seen.clone().expect("identity recorded");

    advance_upstream(&upstream, &scratch, 2);
    let c2 = w.poll_once();
    assert_eq!(c2.notified.len(), 1);
    assert_eq!(c2.notified[0].ahead_count, 2);
    assert_eq!(c2.notified[0].repository_name, "widget");
    assert_ne!(w.targets()[0].last_seen.as_deref(), Some(seen.as_str()));

    // Unchanged upstream head: no second notification.
    let c3 = w.poll_once();
    assert!(c3.all_checked());
    assert!(c3.notified.is_empty());
    assert_eq!(sink.0.borrow().len(), 1);

    // Catch up locally, then upstream moves again by one.
    git(&repo, &["merge", "-q", "--ff-only", "upstream/main"]);
    advance_upstream(&upstream, &scratch, 1);
    let c4 = w.poll_once();
    assert_eq!(c4.notified.len(), 1);
    assert_eq!(c4.notified[0].ahead_count, 1);
    assert_eq!(c4.notified[0].body().split_whitespace().next(), Some("1"));
}

#[test]
fn test_probe_reports_vanished_working_copy() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let repo = td.path().join("gone");
    init_repo_with_default_user(&repo);
    let target = WatchTarget::from_remotes(handle(&repo), &RemoteSet::default());
    let o = oracle(false);

    assert_eq!(o.probe(&target), Err(ProbeError::NoRemote));

    std::fs::remove_dir_all(&repo).unwrap();
    assert!(matches!(o.probe(&target), Err(ProbeError::Missing(_))));

    let mut w = Watcher::new(vec![target], o, Recorder::default());
    let report = w.poll_once();
    assert_eq!(report.total, 1);
    assert_eq!(report.checked, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(w.targets()[0].last_seen, None);
}

#[test]
fn test_declared_upstream_is_fetched_instead_of_remotes() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let remote_a = bare_upstream(&td.path().join("a"));
    let parent_b = td.path().join("b");
    std::fs::create_dir_all(&parent_b).unwrap();
    let declared = parent_b.join("upstream.git");
    git(
        td.path(),
        &["clone", "-q", "--bare", &remote_a.to_string_lossy(), &declared.to_string_lossy()],
    );
    // The working copy's own upstream remote points at A; B is declared explicitly.
    let repo = td.path().join("widget");
    clone_fork(&remote_a, &repo, "https://example.com/alice/widget.git");

    let declared_url = declared.to_string_lossy().to_string();
    let target = WatchTarget::with_declared_url(handle(&repo), declared_url.clone());
    let sink = Recorder::default();
    let mut w = Watcher::new(vec![target], oracle(true), sink.clone());

    let baseline = w.poll_once();
    assert!(baseline.all_checked(), "{:?}", baseline.failures);
    assert!(baseline.notified.is_empty());

    advance_upstream(&declared, &td.path().join("scratch-b"), 2);
    let moved = w.poll_once();
    assert_eq!(moved.notified.len(), 1);
    assert_eq!(moved.notified[0].ahead_count, 2);
    assert_eq!(moved.notified[0].upstream_url, declared_url);

    // Activity on the configured remote is not the declared upstream's business.
    advance_upstream(&remote_a, &td.path().join("scratch-a"), 1);
    let other = w.poll_once();
    assert!(other.all_checked());
    assert!(other.notified.is_empty());
    assert_eq!(sink.0.borrow().len(), 1);
}

#[test]
fn test_declared_upstream_needs_fetching() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let upstream = bare_upstream(td.path());
    let repo = td.path().join("widget");
    clone_fork(&upstream, &repo, "https://example.com/alice/widget.git");
    // A FETCH_HEAD from an earlier unrelated fetch must not stand in for the declared URL.
    git(&repo, &["fetch", "-q", "upstream"]);

    let url = upstream.to_string_lossy().to_string();
    let target = WatchTarget::with_declared_url(handle(&repo), url.clone());
    assert_eq!(oracle(false).probe(&target), Err(ProbeError::FetchFailed(url)));

    let bogus = WatchTarget::with_declared_url(handle(&repo), "--upload-pack=true");
    assert!(matches!(
        oracle(true).probe(&bogus),
        Err(ProbeError::FetchFailed(_))
    ));
}
