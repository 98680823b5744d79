use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::AccessFields;

/// How a caller reaches the lock table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchMode {
    /// Opening a project. Creates the lock record when there is none.
    Join,
    /// Periodic poll. Requires an existing record.
    Heartbeat,
}

/// Access granted to one caller for one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessDecision {
    pub can_edit: bool,
    pub editor: Option<String>,
    pub notify: bool,
    pub in_queue: bool,
    pub became_editor_after_queue: bool,
}

impl From<AccessDecision> for AccessFields {
    fn from(decision: AccessDecision) -> Self {
        AccessFields {
            can_edit: decision.can_edit,
            editor: decision.editor,
            notify: decision.notify,
            in_queue: decision.in_queue,
            became_editor_after_queue: decision.became_editor_after_queue,
        }
    }
}

#[derive(Debug, Clone)]
struct Waiter {
    user: String,
    last_heartbeat: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct EditRecord {
    editor: String,
    last_heartbeat: DateTime<Utc>,
    waiting: VecDeque<Waiter>,
    // Waiter promoted while someone else was polling; told on their next poll
    promoted: Option<String>,
}

impl EditRecord {
    fn new(editor: &str, now: DateTime<Utc>) -> Self {
        Self {
            editor: editor.to_string(),
            last_heartbeat: now,
            waiting: VecDeque::new(),
            promoted: None,
        }
    }

    fn is_waiting(&self, user: &str) -> bool {
        self.waiting.iter().any(|w| w.user == user)
    }
}

/// Per-project edit locks with a FIFO queue of would-be editors.
///
/// At most one editor exists per project. Editors and waiters stay alive by
/// polling; anyone silent for longer than the timeout loses their place.
#[derive(Debug)]
pub struct EditLockTable {
    timeout: Duration,
    records: HashMap<String, EditRecord>,
}

impl EditLockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            records: HashMap::new(),
        }
    }

    /// Register a poll from `user`. Returns `None` for a heartbeat on a project nobody opened.
    pub fn touch(
        &mut self,
        project: &str,
        user: &str,
        has_rights: bool,
        now: DateTime<Utc>,
        mode: TouchMode,
    ) -> Option<AccessDecision> {
        if !has_rights {
            // Observers never enter the queue
            let record = self.records.get(project);
            if record.is_none() && mode == TouchMode::Heartbeat {
                return None;
            }
            return Some(AccessDecision {
                editor: record.map(|r| r.editor.clone()),
                ..AccessDecision::default()
            });
        }

        let record = match self.records.entry(project.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if mode == TouchMode::Heartbeat {
                    return None;
                }
                info!("{} takes the free edit lock on '{}'", user, project);
                entry.insert(EditRecord::new(user, now));
                return Some(AccessDecision {
                    can_edit: true,
                    editor: Some(user.to_string()),
                    ..AccessDecision::default()
                });
            }
        };

        let timeout = self.timeout;
        let mut decision = AccessDecision::default();

        if let Some(waiter) = record.waiting.iter_mut().find(|w| w.user == user) {
            waiter.last_heartbeat = now;
        }
        record.waiting.retain(|w| now - w.last_heartbeat < timeout);

        if now - record.last_heartbeat > timeout {
            let (next, from_queue) = match record.waiting.pop_front() {
                Some(waiter) => (waiter.user, true),
                None => (user.to_string(), false),
            };
            info!("Edit lock on '{}' moves from {} to {}", project, record.editor, next);
            record.editor = next;
            record.last_heartbeat = now;
            record.promoted = None;
            if record.editor == user {
                decision.notify = true;
                decision.became_editor_after_queue = from_queue;
            } else if from_queue {
                record.promoted = Some(record.editor.clone());
            }
        }

        if record.promoted.as_deref() == Some(user) && record.editor == user {
            record.promoted = None;
            decision.notify = true;
            decision.became_editor_after_queue = true;
        }

        if record.editor == user {
            record.last_heartbeat = now;
            decision.can_edit = true;
        } else {
            if !record.is_waiting(user) {
                debug!("{} queued for '{}' behind {}", user, project, record.editor);
                record.waiting.push_back(Waiter {
                    user: user.to_string(),
                    last_heartbeat: now,
                });
                decision.notify = true;
            }
            decision.in_queue = true;
        }

        decision.editor = Some(record.editor.clone());
        Some(decision)
    }

    /// Only the current editor may write. A successful check counts as a heartbeat.
    pub fn authorize_save(&mut self, project: &str, user: &str, now: DateTime<Utc>) -> bool {
        match self.records.get_mut(project) {
            Some(record) if record.editor == user => {
                record.last_heartbeat = now;
                true
            }
            _ => false,
        }
    }

    /// Drop records whose editor and waiters all went silent. Returns how many were dropped.
    ///
    /// A heartbeat on a dropped project is answered like one on a project nobody opened.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let timeout = self.timeout;
        let before = self.records.len();
        self.records.retain(|project, record| {
            let alive = now - record.last_heartbeat <= timeout
                || record.waiting.iter().any(|w| now - w.last_heartbeat < timeout);
            if !alive {
                debug!("Dropping idle edit lock on '{}' held by {}", project, record.editor);
            }
            alive
        });
        before - self.records.len()
    }

    /// Carry the lock record of a renamed project over to its new name
    pub fn rename(&mut self, old_name: &str, new_name: &str) {
        if let Some(record) = self.records.remove(old_name) {
            self.records.insert(new_name.to_string(), record);
        }
    }

    pub fn forget(&mut self, project: &str) {
        self.records.remove(project);
    }

    pub fn locked_projects(&self) -> usize {
        self.records.len()
    }
}

/// Shared, clock-driven front of [`EditLockTable`]
#[derive(Debug)]
pub struct EditLockService {
    table: Mutex<EditLockTable>,
}

impl EditLockService {
    pub fn new(timeout: std::time::Duration) -> Self {
        let timeout = Duration::from_std(timeout).unwrap_or_else(|_| Duration::seconds(30));
        Self {
            table: Mutex::new(EditLockTable::new(timeout)),
        }
    }

    pub async fn join(&self, project: &str, user: &str, has_rights: bool) -> AccessDecision {
        let mut table = self.table.lock().await;
        table
            .touch(project, user, has_rights, Utc::now(), TouchMode::Join)
            .unwrap_or_default()
    }

    pub async fn heartbeat(&self, project: &str, user: &str, has_rights: bool) -> Option<AccessDecision> {
        let mut table = self.table.lock().await;
        table.touch(project, user, has_rights, Utc::now(), TouchMode::Heartbeat)
    }

    pub async fn authorize_save(&self, project: &str, user: &str) -> bool {
        self.table.lock().await.authorize_save(project, user, Utc::now())
    }

    pub async fn prune(&self) -> usize {
        self.table.lock().await.prune(Utc::now())
    }

    pub async fn rename(&self, old_name: &str, new_name: &str) {
        self.table.lock().await.rename(old_name, new_name);
    }

    pub async fn forget(&self, project: &str) {
        self.table.lock().await.forget(project);
    }

    pub async fn locked_projects(&self) -> usize {
        self.table.lock().await.locked_projects()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn table() -> EditLockTable {
        EditLockTable::new(Duration::seconds(30))
    }

    fn queue_position(locks: &EditLockTable, project: &str, user: &str) -> Option<usize> {
        locks.records
            .get(project)?
            .waiting
            .iter()
            .position(|w| w.user == user)
            .map(|idx| idx + 1)
    }

    #[test]
    fn first_joiner_becomes_editor_without_notification() {
        let mut locks = table();
        let d = locks.touch("Notes", "alice", true, t(0), TouchMode::Join).unwrap();
        assert!(d.can_edit);
        assert!(!d.notify);
        assert!(!d.in_queue);
        assert_eq!(d.editor.as_deref(), Some("alice"));
    }

    #[test]
    fn second_joiner_is_queued_and_notified_once() {
        let mut locks = table();
        locks.touch("Notes", "alice", true, t(0), TouchMode::Join);

        let d = locks.touch("Notes", "bob", true, t(1), TouchMode::Join).unwrap();
        assert!(!d.can_edit);
        assert!(d.in_queue);
        assert!(d.notify);
        assert_eq!(d.editor.as_deref(), Some("alice"));

        let d = locks.touch("Notes", "bob", true, t(4), TouchMode::Heartbeat).unwrap();
        assert!(d.in_queue);
        assert!(!d.notify);
        assert_eq!(queue_position(&locks, "Notes", "bob"), Some(1));
    }

    #[test]
    fn heartbeat_on_unopened_project_is_rejected() {
        let mut locks = table();
        assert!(locks.touch("Ghost", "alice", true, t(0), TouchMode::Heartbeat).is_none());
        assert!(locks.touch("Ghost", "alice", false, t(0), TouchMode::Heartbeat).is_none());
    }

    #[test]
    fn viewers_see_the_editor_but_never_queue() {
        let mut locks = table();
        locks.touch("Notes", "alice", true, t(0), TouchMode::Join);
        let d = locks.touch("Notes", "vera", false, t(1), TouchMode::Join).unwrap();
        assert!(!d.can_edit);
        assert!(!d.in_queue);
        assert_eq!(d.editor.as_deref(), Some("alice"));
        assert_eq!(queue_position(&locks, "Notes", "vera"), None);
    }

    #[test]
    fn lapsed_editor_hands_over_to_first_waiter_who_polls() {
        let mut locks = table();
        locks.touch("Notes", "alice", true, t(0), TouchMode::Join);
        locks.touch("Notes", "bob", true, t(1), TouchMode::Join);

        // bob keeps polling, alice went silent
        for s in [4, 10, 20, 28] {
            locks.touch("Notes", "bob", true, t(s), TouchMode::Heartbeat);
        }
        let d = locks.touch("Notes", "bob", true, t(31), TouchMode::Heartbeat).unwrap();
        assert!(d.can_edit);
        assert!(d.notify);
        assert!(d.became_editor_after_queue);
        assert_eq!(d.editor.as_deref(), Some("bob"));

        let d = locks.touch("Notes", "bob", true, t(34), TouchMode::Heartbeat).unwrap();
        assert!(d.can_edit);
        assert!(!d.became_editor_after_queue);
    }

    #[test]
    fn waiter_promoted_by_someone_else_learns_it_on_next_poll() {
        let mut locks = table();
        locks.touch("Notes", "alice", true, t(0), TouchMode::Join);
        locks.touch("Notes", "bob", true, t(1), TouchMode::Join);
        locks.touch("Notes", "carol", true, t(2), TouchMode::Join);

        for s in [10, 20, 29] {
            locks.touch("Notes", "bob", true, t(s), TouchMode::Heartbeat);
            locks.touch("Notes", "carol", true, t(s), TouchMode::Heartbeat);
        }

        // carol's poll notices the lapse; bob is first in line
        let d = locks.touch("Notes", "carol", true, t(31), TouchMode::Heartbeat).unwrap();
        assert!(!d.can_edit);
        assert!(d.in_queue);
        assert_eq!(d.editor.as_deref(), Some("bob"));

        let d = locks.touch("Notes", "bob", true, t(32), TouchMode::Heartbeat).unwrap();
        assert!(d.can_edit);
        assert!(d.became_editor_after_queue);
        assert!(d.notify);

        let d = locks.touch("Notes", "bob", true, t(35), TouchMode::Heartbeat).unwrap();
        assert!(!d.became_editor_after_queue);
    }

    #[test]
    fn silent_waiters_are_pruned_before_promotion() {
        let mut locks = table();
        locks.touch("Notes", "alice", true, t(0), TouchMode::Join);
        locks.touch("Notes", "bob", true, t(1), TouchMode::Join);
        locks.touch("Notes", "carol", true, t(2), TouchMode::Join);

        // only carol keeps polling
        for s in [15, 29] {
            locks.touch("Notes", "carol", true, t(s), TouchMode::Heartbeat);
        }
        let d = locks.touch("Notes", "carol", true, t(40), TouchMode::Heartbeat).unwrap();
        assert!(d.can_edit);
        assert!(d.became_editor_after_queue);
        assert_eq!(queue_position(&locks, "Notes", "bob"), None);
    }

    #[test]
    fn lapsed_editor_with_empty_queue_goes_to_caller() {
        let mut locks = table();
        locks.touch("Notes", "alice", true, t(0), TouchMode::Join);
        let d = locks.touch("Notes", "bob", true, t(45), TouchMode::Join).unwrap();
        assert!(d.can_edit);
        assert!(d.notify);
        assert!(!d.became_editor_after_queue);
    }

    #[test]
    fn only_current_editor_may_save() {
        let mut locks = table();
        assert!(!locks.authorize_save("Notes", "alice", t(0)));
        locks.touch("Notes", "alice", true, t(0), TouchMode::Join);
        locks.touch("Notes", "bob", true, t(1), TouchMode::Join);
        assert!(locks.authorize_save("Notes", "alice", t(2)));
        assert!(!locks.authorize_save("Notes", "bob", t(2)));
        assert_eq!(locks.locked_projects(), 1);
    }

    #[test]
    fn saving_keeps_the_editor_alive() {
        let mut locks = table();
        locks.touch("Notes", "alice", true, t(0), TouchMode::Join);
        locks.touch("Notes", "bob", true, t(1), TouchMode::Join);
        locks.touch("Notes", "bob", true, t(20), TouchMode::Heartbeat);
        assert!(locks.authorize_save("Notes", "alice", t(25)));
        let d = locks.touch("Notes", "bob", true, t(40), TouchMode::Heartbeat).unwrap();
        assert!(!d.can_edit);
        assert_eq!(d.editor.as_deref(), Some("alice"));
    }

    #[test]
    fn idle_records_are_pruned_while_live_ones_stay() {
        let mut locks = table();
        locks.touch("Quiet", "alice", true, t(0), TouchMode::Join);
        locks.touch("Busy", "bob", true, t(0), TouchMode::Join);
        locks.touch("Waiting", "carol", true, t(0), TouchMode::Join);
        locks.touch("Waiting", "dave", true, t(1), TouchMode::Join);

        locks.touch("Busy", "bob", true, t(25), TouchMode::Heartbeat);
        // carol lapsed but dave still waits
        locks.touch("Waiting", "dave", true, t(25), TouchMode::Heartbeat);

        assert_eq!(locks.prune(t(40)), 1);
        assert_eq!(locks.locked_projects(), 2);
        assert!(locks.touch("Quiet", "alice", true, t(41), TouchMode::Heartbeat).is_none());

        let d = locks.touch("Waiting", "dave", true, t(42), TouchMode::Heartbeat).unwrap();
        assert!(d.can_edit);
        assert!(d.became_editor_after_queue);
    }

    #[test]
    fn renamed_projects_keep_their_editor() {
        let mut locks = table();
        locks.touch("Draft", "alice", true, t(0), TouchMode::Join);
        locks.touch("Draft", "bob", true, t(1), TouchMode::Join);

        locks.rename("Draft", "Final");
        assert!(locks.authorize_save("Final", "alice", t(2)));
        assert!(!locks.authorize_save("Draft", "alice", t(2)));
        assert_eq!(queue_position(&locks, "Final", "bob"), Some(1));

        locks.forget("Final");
        assert_eq!(locks.locked_projects(), 0);
    }
}
