//! Ring interaction state machine.
//!
//! The engine is driven by one [`InputSnapshot`] per frame and answers with
//! [`RingEvent`]s. It never executes anything: committed items leave as
//! [`CommitRequest`]s that the host forwards to its [`Executor`], for example
//! through [`dispatch_commits`].

use crate::config::Settings;
use crate::events::{CloseReason, CommitRequest, InputSnapshot, RingEvent};
use crate::item::{Executor, GameData, InvalidReason, MAX_ACTIVATION_TIME, MIN_ACTIVATION_TIME};
use crate::keybind::Key;
use crate::menu::model::{self, Session};
use crate::menu::{MAX_NESTING_DEPTH, Point};
use crate::ring::{Ring, RingList};
use std::collections::BTreeSet;
use std::time::Duration;

/// Rising-edge detection over the key binds of every ring.
#[derive(Debug, Default)]
pub struct KeyBindMatcher {
    satisfied: BTreeSet<usize>,
}

impl KeyBindMatcher {
    /// Rings whose combo became satisfied this tick and that apply to the
    /// snapshot's job, in list order. The first entry is the ring to activate.
    pub fn triggered(&mut self, rings: &RingList, input: &InputSnapshot) -> Vec<usize> {
        let now: BTreeSet<usize> = rings
            .iter()
            .enumerate()
            .filter(|(_, ring)| {
                ring.key_bind
                    .combo
                    .is_some_and(|combo| combo.is_satisfied_by(input))
            })
            .map(|(index, _)| index)
            .collect();

        let triggered = now
            .difference(&self.satisfied)
            .copied()
            .filter(|&index| rings[index].key_bind.applies_to(input.job))
            .collect();
        self.satisfied = now;
        triggered
    }

    pub fn reset(&mut self) {
        self.satisfied.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy)]
struct NestedTarget {
    ring: usize,
    keep_center: bool,
    activation: Duration,
}

/// Child ring a nested item would open from a session at `depth`.
fn nested_target(rings: &RingList, ring: &Ring, index: usize, depth: usize) -> Option<NestedTarget> {
    let nested = ring.items.get(index)?.nested_ring()?;
    if depth >= MAX_NESTING_DEPTH {
        return None;
    }
    let child = rings.position_by_name(nested.ring_name.as_str())?;
    let seconds = nested
        .activation_time
        .max(MIN_ACTIVATION_TIME)
        .min(MAX_ACTIVATION_TIME);

    Some(NestedTarget {
        ring: child,
        keep_center: nested.keep_center,
        activation: Duration::try_from_secs_f32(seconds).unwrap_or_default(),
    })
}

pub struct Engine {
    settings: Settings,
    matcher: KeyBindMatcher,
    /// Root session first, nested children above it.
    sessions: Vec<Session>,
    escape_down: bool,
    clock: Duration,
    last_trigger: Option<(usize, Duration)>,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            matcher: KeyBindMatcher::default(),
            sessions: Vec::new(),
            escape_down: false,
            clock: Duration::ZERO,
            last_trigger: None,
        }
    }

    pub fn tick(&mut self, input: &InputSnapshot, data: &dyn GameData) -> Vec<RingEvent> {
        self.clock += input.delta;
        let triggered = self.matcher.triggered(&self.settings.rings, input);
        let escape_down = input.keys_down.contains(&Key::Escape);
        let escape_pressed = escape_down && !self.escape_down;
        self.escape_down = escape_down;

        let mut events = Vec::new();
        if self.sessions.is_empty() {
            if let Some(&ring) = triggered.first() {
                self.activate(ring, input, data, &mut events);
            }
        } else {
            self.step_open(input, &triggered, escape_pressed, data, &mut events);
        }
        events
    }

    fn activate(
        &mut self,
        ring: usize,
        input: &InputSnapshot,
        data: &dyn GameData,
        events: &mut Vec<RingEvent>,
    ) {
        if self.is_double_activation(ring) {
            self.last_trigger = None;
            log::debug!("Double activation of ring {}", ring);
            let target = &self.settings.rings[ring];
            if target.prevent_action_on_close {
                log::debug!("Quick action of ring {} suppressed", ring);
            } else if let Some(index) = target.quick_action_index {
                match self.resolve(ring, index, data) {
                    Ok(Some(request)) => events.push(RingEvent::Commit(request)),
                    Ok(None) => {}
                    Err(reason) => log::warn!("Quick action of ring {} is invalid: {}", ring, reason),
                }
            }
            return;
        }

        self.last_trigger = Some((ring, self.clock));
        let center = self.settings.ring_center(input.cursor, input.viewport);
        self.sessions.push(Session::new(ring, center));
        log::debug!("Ring {} opened at ({}, {})", ring, center.x, center.y);

        events.push(RingEvent::Activated { ring, center });
        if self.settings.auto_center_cursor && !self.settings.appear_at_cursor {
            events.push(RingEvent::WarpCursor(center));
        }
    }

    fn is_double_activation(&self, ring: usize) -> bool {
        let window = self.settings.double_activation_window();
        self.last_trigger
            .is_some_and(|(last, at)| last == ring && self.clock.saturating_sub(at) <= window)
            && self
                .settings
                .rings
                .get(ring)
                .is_some_and(|r| r.quick_action().is_some())
    }

    fn step_open(
        &mut self,
        input: &InputSnapshot,
        triggered: &[usize],
        escape_pressed: bool,
        data: &dyn GameData,
        events: &mut Vec<RingEvent>,
    ) {
        let Some(root) = self.sessions.first().map(|s| s.ring) else {
            return;
        };

        if escape_pressed && self.settings.escape_to_close {
            if self.sessions.len() > 1 {
                self.pop_nested(events);
            } else {
                self.close(CloseReason::Cancelled, events);
            }
            return;
        }

        if self.update_hover(input, events) {
            return;
        }

        if input.quick_action {
            self.commit_quick_action(root, data, events);
            return;
        }

        let Some(bind) = self.settings.rings.get(root).map(|r| r.key_bind.clone()) else {
            self.close(CloseReason::Cancelled, events);
            return;
        };

        if bind.toggle {
            if triggered.contains(&root) {
                if self.is_double_activation(root) {
                    self.last_trigger = None;
                    self.commit_quick_action(root, data, events);
                } else {
                    self.last_trigger = Some((root, self.clock));
                    if self.settings.rings[root].prevent_action_on_close {
                        self.close(CloseReason::Cancelled, events);
                    } else {
                        self.commit_hovered(data, events);
                    }
                }
                return;
            }
        } else if bind.combo.is_none_or(|combo| !combo.is_held_in(input)) {
            self.commit_hovered(data, events);
            return;
        }

        if input.clicked {
            self.click(data, events);
        }
    }

    /// Returns whether a nested ring opened; the rest of the tick belongs to it.
    fn update_hover(&mut self, input: &InputSnapshot, events: &mut Vec<RingEvent>) -> bool {
        let dead_zone = self.settings.dead_zone_radius;
        let depth = self.sessions.len();
        let Some(top) = self.sessions.last_mut() else {
            return false;
        };
        let Some(ring) = self.settings.rings.get(top.ring) else {
            return false;
        };

        let arrived = top.update_cursor(ring, input.cursor, dead_zone);
        if arrived {
            log::trace!("Ring {} hover -> {:?}", top.ring, top.hovered);
        }
        let Some(index) = top.hovered else {
            return false;
        };
        let Some(target) = nested_target(&self.settings.rings, ring, index, depth) else {
            top.reset_hover_timer();
            return false;
        };

        // hover time starts counting on the tick after the cursor arrives
        if arrived || !top.advance_nested_hover(input.delta, target.activation) {
            return false;
        }
        self.open_nested(index, target, events);
        true
    }

    fn click(&mut self, data: &dyn GameData, events: &mut Vec<RingEvent>) {
        let depth = self.sessions.len();
        let Some(top) = self.sessions.last_mut() else {
            return;
        };
        let ring = top.ring;
        let Some(index) = top.hovered else {
            self.close(CloseReason::Cancelled, events);
            return;
        };

        let target = self
            .settings
            .rings
            .get(ring)
            .and_then(|r| nested_target(&self.settings.rings, r, index, depth));
        match target {
            Some(target) => {
                top.mark_spent();
                self.open_nested(index, target, events);
            }
            None => self.commit(ring, index, data, events),
        }
    }

    fn open_nested(&mut self, index: usize, target: NestedTarget, events: &mut Vec<RingEvent>) {
        let Some(parent) = self.sessions.last() else {
            return;
        };
        let Some(parent_ring) = self.settings.rings.get(parent.ring) else {
            return;
        };

        let center = if target.keep_center {
            parent.center
        } else {
            model::item_position(parent_ring, parent.center, index)
        };
        let parent = parent.ring;

        self.sessions.push(Session::new(target.ring, center));
        log::debug!(
            "Nested ring {} opened from ring {} (depth {})",
            target.ring,
            parent,
            self.sessions.len()
        );
        events.push(RingEvent::NestedActivated {
            ring: target.ring,
            parent,
            center,
        });
    }

    fn pop_nested(&mut self, events: &mut Vec<RingEvent>) {
        if self.sessions.len() < 2 {
            return;
        }
        if let Some(child) = self.sessions.pop() {
            if let Some(parent) = self.sessions.last_mut() {
                parent.clear_hover();
            }
            log::debug!("Nested ring {} dismissed", child.ring);
            events.push(RingEvent::NestedDismissed { ring: child.ring });
        }
    }

    /// What committing an item resolves to; `Ok(None)` for items without a
    /// payload such as nested rings.
    fn resolve(
        &self,
        ring: usize,
        index: usize,
        data: &dyn GameData,
    ) -> Result<Option<CommitRequest>, InvalidReason> {
        let rings = &self.settings.rings;
        let Some(item) = rings.get(ring).and_then(|r| r.items.get(index)) else {
            return Ok(None);
        };
        item.kind.check(data, rings)?;
        Ok(item
            .payload()
            .map(|payload| CommitRequest { ring, index, payload }))
    }

    fn commit(&mut self, ring: usize, index: usize, data: &dyn GameData, events: &mut Vec<RingEvent>) {
        match self.resolve(ring, index, data) {
            Ok(Some(request)) => {
                log::debug!("Committing item {} of ring {}", index, ring);
                events.push(RingEvent::Commit(request));
                self.close(CloseReason::Committed, events);
            }
            Ok(None) => self.close(CloseReason::Cancelled, events),
            Err(reason) => {
                log::warn!("Item {} of ring {} is invalid: {}", index, ring, reason);
                self.close(CloseReason::InvalidItem(reason), events);
            }
        }
    }

    fn commit_hovered(&mut self, data: &dyn GameData, events: &mut Vec<RingEvent>) {
        match self.sessions.last().and_then(|s| s.hovered.map(|h| (s.ring, h))) {
            Some((ring, index)) => self.commit(ring, index, data, events),
            None => self.close(CloseReason::Cancelled, events),
        }
    }

    fn commit_quick_action(&mut self, root: usize, data: &dyn GameData, events: &mut Vec<RingEvent>) {
        let Some(ring) = self.settings.rings.get(root) else {
            return;
        };
        match ring.quick_action_index {
            Some(_) if ring.prevent_action_on_close => self.close(CloseReason::Cancelled, events),
            Some(index) => self.commit(root, index, data, events),
            None => log::debug!("Ring {} has no quick action", root),
        }
    }

    fn close(&mut self, reason: CloseReason, events: &mut Vec<RingEvent>) {
        let Some(root) = self.sessions.first().map(|s| s.ring) else {
            return;
        };
        self.sessions.clear();
        log::debug!("Ring {} closed: {:?}", root, reason);
        events.push(RingEvent::Closed { ring: root, reason });
    }

    /// Closes any open session without committing.
    pub fn cancel(&mut self) -> Option<RingEvent> {
        let mut events = Vec::new();
        self.close(CloseReason::Cancelled, &mut events);
        events.pop()
    }

    pub fn state(&self) -> SessionState {
        if self.sessions.is_empty() {
            SessionState::Closed
        } else {
            SessionState::Open
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn top_session(&self) -> Option<&Session> {
        self.sessions.last()
    }

    pub fn root_ring(&self) -> Option<usize> {
        self.sessions.first().map(|s| s.ring)
    }

    /// Ring of the topmost session, the one receiving cursor input.
    pub fn active_ring(&self) -> Option<&Ring> {
        self.top_session()
            .and_then(|s| self.settings.rings.get(s.ring))
    }

    pub fn hovered(&self) -> Option<usize> {
        self.top_session().and_then(|s| s.hovered)
    }

    pub fn depth(&self) -> usize {
        self.sessions.len()
    }

    /// Hover progress towards opening the hovered nested item, if any.
    pub fn nested_progress(&self) -> Option<f32> {
        let session = self.top_session()?;
        let ring = self.settings.rings.get(session.ring)?;
        let index = session.hovered?;
        if session.is_spent(index) {
            return None;
        }
        let target = nested_target(&self.settings.rings, ring, index, self.depth())?;
        Some(session.hover_progress(target.activation))
    }

    /// Screen position of an item of the topmost ring.
    pub fn item_position(&self, index: usize) -> Option<Point> {
        let session = self.top_session()?;
        let ring = self.active_ring()?;
        (index < ring.items.len()).then(|| model::item_position(ring, session.center, index))
    }

    pub fn item_angle(&self, index: usize) -> Option<f32> {
        let ring = self.active_ring()?;
        (index < ring.items.len()).then(|| model::item_angle(ring, index))
    }

    /// Whether the host should swallow this input instead of passing it on.
    pub fn blocks_input(&self, input: &InputSnapshot) -> bool {
        if self.settings.keybind_passthrough {
            return false;
        }
        !self.sessions.is_empty()
            || self.settings.rings.iter().any(|ring| {
                ring.key_bind.applies_to(input.job)
                    && ring
                        .key_bind
                        .combo
                        .is_some_and(|combo| combo.is_satisfied_by(input))
            })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn rings(&self) -> &RingList {
        &self.settings.rings
    }

    /// Mutable access for editors. Any open session is cancelled first.
    pub fn settings_mut(&mut self) -> &mut Settings {
        self.invalidate();
        &mut self.settings
    }

    pub fn rings_mut(&mut self) -> &mut RingList {
        &mut self.settings_mut().rings
    }

    /// Swaps in freshly loaded settings, returning the `Closed` event of a
    /// session that had to be cancelled.
    pub fn replace_settings(&mut self, settings: Settings) -> Option<RingEvent> {
        let closed = self.cancel();
        self.matcher.reset();
        self.last_trigger = None;
        self.settings = settings;
        closed
    }

    fn invalidate(&mut self) {
        if self.cancel().is_some() {
            log::debug!("Open ring cancelled by a configuration edit");
        }
        self.matcher.reset();
        self.last_trigger = None;
    }
}

/// Forwards every commit in `events` to `executor`. Returns how many ran.
pub fn dispatch_commits(events: &[RingEvent], executor: &mut impl Executor) -> usize {
    let mut count = 0;
    for event in events {
        if let RingEvent::Commit(request) = event {
            executor.execute(&request.payload);
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ActionItem, ExecutePayload, ItemKind, NestedRing, RefKind, StaticCatalog};
    use crate::keybind::{JobId, KeyBind, KeyCombo, Modifiers};
    use crate::ring::ItemSize;
    use palette::Srgba;

    const CENTER: Point = Point::new(500.0, 500.0);
    const FRAME: Duration = Duration::from_millis(16);

    fn combo(s: &str) -> KeyCombo {
        s.parse().unwrap()
    }

    fn command(text: &str) -> ActionItem {
        ActionItem::new(ItemKind::Command {
            command: text.to_string(),
        })
    }

    fn ring(name: &str, key_bind: KeyBind, items: Vec<ActionItem>) -> Ring {
        Ring::new(
            name,
            Srgba::new(1.0, 1.0, 1.0, 1.0),
            key_bind,
            150.0,
            ItemSize::square(40.0),
        )
        .with_items(items)
    }

    fn commands(count: usize) -> Vec<ActionItem> {
        (0..count).map(|i| command(&format!("/echo {i}"))).collect()
    }

    fn engine(rings: Vec<Ring>) -> Engine {
        Engine::new(Settings {
            rings: RingList::new(rings),
            ..Settings::default()
        })
    }

    fn at(degrees: f32) -> Point {
        CENTER.offset(degrees.to_radians(), 100.0)
    }

    fn held(combo: KeyCombo, cursor: Point) -> InputSnapshot {
        InputSnapshot {
            modifiers: combo.modifiers,
            cursor,
            delta: FRAME,
            ..InputSnapshot::with_keys([combo.key])
        }
    }

    fn idle(cursor: Point) -> InputSnapshot {
        InputSnapshot {
            cursor,
            delta: FRAME,
            ..InputSnapshot::default()
        }
    }

    fn closed(ring: usize, reason: CloseReason) -> RingEvent {
        RingEvent::Closed { ring, reason }
    }

    fn commit(ring: usize, index: usize) -> RingEvent {
        RingEvent::Commit(CommitRequest {
            ring,
            index,
            payload: ExecutePayload::RunCommand {
                command: format!("/echo {index}"),
            },
        })
    }

    #[test]
    fn test_toggle_ring_commits_hovered_item_on_second_press() {
        let bind = KeyBind::new(combo("Ctrl+F1")).toggled();
        let mut engine = engine(vec![ring("Heals", bind, commands(4))]);
        let data = StaticCatalog::permissive();
        let press = combo("Ctrl+F1");

        assert_eq!(
            engine.tick(&held(press, CENTER), &data),
            vec![RingEvent::Activated {
                ring: 0,
                center: CENTER
            }]
        );
        assert!(engine.tick(&idle(at(100.0)), &data).is_empty());
        assert_eq!(engine.hovered(), Some(1));

        assert_eq!(
            engine.tick(&held(press, at(100.0)), &data),
            vec![commit(0, 1), closed(0, CloseReason::Committed)]
        );
        assert_eq!(engine.state(), SessionState::Closed);
        // still holding the combo is not a new trigger
        assert!(engine.tick(&held(press, at(100.0)), &data).is_empty());
    }

    #[test]
    fn test_hold_release_commits_exactly_once() {
        let mut engine = engine(vec![ring("Main", KeyBind::new(combo("Ctrl+1")), commands(4))]);
        let data = StaticCatalog::permissive();
        let press = combo("Ctrl+1");

        engine.tick(&held(press, CENTER), &data);
        assert!(engine.tick(&held(press, at(10.0)), &data).is_empty());

        let mut events = engine.tick(&idle(at(10.0)), &data);
        events.extend(engine.tick(&idle(at(10.0)), &data));
        assert_eq!(events, vec![commit(0, 0), closed(0, CloseReason::Committed)]);
    }

    #[test]
    fn test_release_in_dead_zone_cancels() {
        let mut engine = engine(vec![ring("Main", KeyBind::new(combo("Ctrl+1")), commands(4))]);
        let data = StaticCatalog::permissive();

        engine.tick(&held(combo("Ctrl+1"), CENTER), &data);
        engine.tick(&held(combo("Ctrl+1"), at(10.0)), &data);
        assert_eq!(
            engine.tick(&idle(Point::new(510.0, 505.0)), &data),
            vec![closed(0, CloseReason::Cancelled)]
        );
    }

    #[test]
    fn test_extra_modifiers_do_not_release_or_trigger() {
        let mut engine = engine(vec![ring("Main", KeyBind::new(combo("Ctrl+1")), commands(2))]);
        let data = StaticCatalog::permissive();

        assert!(engine.tick(&held(combo("Ctrl+Shift+1"), CENTER), &data).is_empty());
        assert_eq!(engine.state(), SessionState::Closed);
        engine.tick(&idle(CENTER), &data);

        engine.tick(&held(combo("Ctrl+1"), CENTER), &data);
        assert!(engine.tick(&held(combo("Ctrl+Shift+1"), CENTER), &data).is_empty());
        assert_eq!(engine.state(), SessionState::Open);
    }

    #[test]
    fn test_first_matching_ring_wins_with_job_filter() {
        let cases = vec![(None, 1), (Some(JobId::new(24)), 0), (Some(JobId::new(19)), 1)];
        for (job, expected) in cases {
            let mut engine = engine(vec![
                ring("Job", KeyBind::new(combo("Ctrl+1")).with_jobs([JobId::new(24)]), commands(2)),
                ring("Global", KeyBind::new(combo("Ctrl+1")), commands(2)),
            ]);
            let input = InputSnapshot {
                job,
                ..held(combo("Ctrl+1"), CENTER)
            };
            engine.tick(&input, &StaticCatalog::permissive());
            assert_eq!(engine.root_ring(), Some(expected), "{job:?}");
        }
    }

    #[test]
    fn test_unbound_ring_never_matches() {
        let mut engine = engine(vec![ring("Loose", KeyBind::unbound(), commands(2))]);
        engine.tick(&held(combo("Ctrl+1"), CENTER), &StaticCatalog::permissive());
        assert_eq!(engine.state(), SessionState::Closed);
    }

    #[test]
    fn test_no_second_root_while_open() {
        let mut engine = engine(vec![
            ring("A", KeyBind::new(combo("Ctrl+1")).toggled(), commands(2)),
            ring("B", KeyBind::new(combo("Ctrl+2")), commands(2)),
        ]);
        let data = StaticCatalog::permissive();

        engine.tick(&held(combo("Ctrl+1"), CENTER), &data);
        engine.tick(&idle(CENTER), &data);
        assert!(engine.tick(&held(combo("Ctrl+2"), CENTER), &data).is_empty());
        assert_eq!(engine.root_ring(), Some(0));
        assert_eq!(engine.depth(), 1);
    }

    #[test]
    fn test_toggle_close_with_prevent_action_cancels() {
        let mut heals = ring("Heals", KeyBind::new(combo("F2")).toggled(), commands(4));
        heals.prevent_action_on_close = true;
        let mut engine = engine(vec![heals]);
        let data = StaticCatalog::permissive();

        engine.tick(&held(combo("F2"), CENTER), &data);
        engine.tick(&idle(at(100.0)), &data);
        assert_eq!(
            engine.tick(&held(combo("F2"), at(100.0)), &data),
            vec![closed(0, CloseReason::Cancelled)]
        );
    }

    #[test]
    fn test_quick_action_flag_ignores_hover() {
        let cases = [
            (false, vec![commit(0, 2), closed(0, CloseReason::Committed)]),
            (true, vec![closed(0, CloseReason::Cancelled)]),
        ];

        for (prevent, expected) in cases {
            let mut main = ring("Main", KeyBind::new(combo("F2")).toggled(), commands(4));
            main.prevent_action_on_close = prevent;
            main.set_quick_action(Some(2)).unwrap();
            let mut engine = engine(vec![main]);
            let data = StaticCatalog::permissive();

            engine.tick(&held(combo("F2"), CENTER), &data);
            engine.tick(&idle(at(10.0)), &data);
            let input = InputSnapshot {
                quick_action: true,
                ..idle(at(10.0))
            };
            assert_eq!(engine.tick(&input, &data), expected, "prevent: {prevent}");
        }
    }

    #[test]
    fn test_toggle_double_press_respects_prevent_action() {
        let cases = [
            (false, vec![commit(0, 2), closed(0, CloseReason::Committed)]),
            (true, vec![closed(0, CloseReason::Cancelled)]),
        ];

        for (prevent, expected) in cases {
            let mut main = ring("Main", KeyBind::new(combo("F2")).toggled(), commands(4));
            main.prevent_action_on_close = prevent;
            main.set_quick_action(Some(2)).unwrap();
            let mut engine = engine(vec![main]);
            let data = StaticCatalog::permissive();

            engine.tick(&held(combo("F2"), CENTER), &data);
            engine.tick(&idle(at(10.0)), &data);
            assert_eq!(
                engine.tick(&held(combo("F2"), at(10.0)), &data),
                expected,
                "prevent: {prevent}"
            );
            assert_eq!(engine.state(), SessionState::Closed);
        }
    }

    #[test]
    fn test_hold_double_press_respects_prevent_action() {
        let mut main = ring("Main", KeyBind::new(combo("F3")), commands(4));
        main.prevent_action_on_close = true;
        main.set_quick_action(Some(1)).unwrap();
        let mut engine = engine(vec![main]);
        let data = StaticCatalog::permissive();

        engine.tick(&held(combo("F3"), CENTER), &data);
        engine.tick(&idle(CENTER), &data);
        assert!(engine.tick(&held(combo("F3"), CENTER), &data).is_empty());
        assert_eq!(engine.state(), SessionState::Closed);
    }

    #[test]
    fn test_double_activation_commits_quick_action() {
        let mut main = ring("Main", KeyBind::new(combo("F3")), commands(4));
        main.set_quick_action(Some(1)).unwrap();
        let mut engine = engine(vec![main]);
        let data = StaticCatalog::permissive();

        engine.tick(&held(combo("F3"), CENTER), &data);
        assert_eq!(
            engine.tick(&idle(CENTER), &data),
            vec![closed(0, CloseReason::Cancelled)]
        );
        assert_eq!(engine.tick(&held(combo("F3"), CENTER), &data), vec![commit(0, 1)]);
        assert_eq!(engine.state(), SessionState::Closed);

        // a third press opens normally
        engine.tick(&idle(CENTER), &data);
        assert_eq!(engine.tick(&held(combo("F3"), CENTER), &data).len(), 1);
        assert_eq!(engine.state(), SessionState::Open);
    }

    #[test]
    fn test_slow_second_activation_opens_again() {
        let mut main = ring("Main", KeyBind::new(combo("F3")), commands(4));
        main.set_quick_action(Some(1)).unwrap();
        let mut engine = engine(vec![main]);
        let data = StaticCatalog::permissive();

        engine.tick(&held(combo("F3"), CENTER), &data);
        let pause = InputSnapshot {
            delta: Duration::from_millis(500),
            ..idle(CENTER)
        };
        engine.tick(&pause, &data);
        assert!(matches!(
            engine.tick(&held(combo("F3"), CENTER), &data)[..],
            [RingEvent::Activated { ring: 0, .. }]
        ));
    }

    #[test]
    fn test_invalid_item_closes_without_commit() {
        let items = vec![ActionItem::new(ItemKind::Action { action_id: 7 })];
        let mut engine = engine(vec![ring("Main", KeyBind::new(combo("Ctrl+1")), items)]);
        let data = StaticCatalog::default();

        engine.tick(&held(combo("Ctrl+1"), CENTER), &data);
        engine.tick(&held(combo("Ctrl+1"), at(10.0)), &data);
        assert_eq!(
            engine.tick(&idle(at(10.0)), &data),
            vec![closed(
                0,
                CloseReason::InvalidItem(InvalidReason::MissingReference {
                    kind: RefKind::Action,
                    id: 7
                })
            )]
        );
    }

    fn nested_engine(keep_center: bool) -> Engine {
        let main = ring(
            "Main",
            KeyBind::new(combo("Ctrl+1")),
            vec![
                ActionItem::new(ItemKind::NestedRing(NestedRing::new("Sub", 0.5, keep_center))),
                command("/echo 1"),
            ],
        );
        let sub = ring("Sub", KeyBind::unbound(), commands(2));
        engine(vec![main, sub])
    }

    fn slow(input: InputSnapshot) -> InputSnapshot {
        InputSnapshot {
            delta: Duration::from_millis(250),
            ..input
        }
    }

    #[test]
    fn test_nested_ring_opens_once_after_hover_time() {
        let mut engine = nested_engine(false);
        let data = StaticCatalog::permissive();
        let press = combo("Ctrl+1");

        engine.tick(&held(press, CENTER), &data);
        // the tick that brings the cursor onto the item does not count
        assert!(engine.tick(&slow(held(press, at(90.0))), &data).is_empty());
        assert_eq!(engine.nested_progress(), Some(0.0));
        assert!(engine.tick(&slow(held(press, at(90.0))), &data).is_empty());
        assert!((engine.nested_progress().unwrap() - 0.5).abs() < 1e-3);

        let events = engine.tick(&slow(held(press, at(90.0))), &data);
        let [RingEvent::NestedActivated { ring: 1, parent: 0, center }] = events[..] else {
            panic!("unexpected events {events:?}");
        };
        assert!((center.x - 500.0).abs() < 1e-3 && (center.y - 650.0).abs() < 1e-3);
        assert_eq!(engine.depth(), 2);

        // the child is centered on the item, the cursor now sits in its lower half
        assert!(engine.tick(&slow(held(press, at(90.0))), &data).is_empty());
        assert_eq!(engine.hovered(), Some(1));
        assert_eq!(
            engine.tick(&idle(at(90.0)), &data),
            vec![commit(1, 1), closed(0, CloseReason::Committed)]
        );
    }

    #[test]
    fn test_escape_backs_out_of_nested_then_closes() {
        let mut engine = nested_engine(true);
        let data = StaticCatalog::permissive();
        let press = combo("Ctrl+1");

        engine.tick(&held(press, CENTER), &data);
        for _ in 0..3 {
            engine.tick(&slow(held(press, at(90.0))), &data);
        }
        assert_eq!(engine.sessions()[1].center, CENTER);

        let mut escape = held(press, at(90.0));
        escape.keys_down.insert(Key::Escape);
        assert_eq!(
            engine.tick(&escape, &data),
            vec![RingEvent::NestedDismissed { ring: 1 }]
        );
        assert_eq!(engine.depth(), 1);

        // backing out leaves the nested item inert until hover leaves it
        let mut wait = slow(held(press, at(90.0)));
        wait.delta = Duration::from_secs(2);
        assert!(engine.tick(&wait, &data).is_empty());
        assert_eq!(engine.depth(), 1);

        engine.tick(&held(press, at(90.0)), &data);
        assert_eq!(
            engine.tick(&escape, &data),
            vec![closed(0, CloseReason::Cancelled)]
        );
    }

    #[test]
    fn test_click_on_tick_child_opens_goes_to_child() {
        let mut engine = nested_engine(false);
        let data = StaticCatalog::permissive();
        let press = combo("Ctrl+1");

        engine.tick(&held(press, CENTER), &data);
        engine.tick(&held(press, at(90.0)), &data);
        engine.tick(&slow(held(press, at(90.0))), &data);

        let click = InputSnapshot {
            clicked: true,
            delta: Duration::from_millis(300),
            ..held(press, at(90.0))
        };
        let events = engine.tick(&click, &data);
        assert!(
            matches!(events[..], [RingEvent::NestedActivated { ring: 1, parent: 0, .. }]),
            "unexpected events {events:?}"
        );
        assert_eq!(engine.depth(), 2);
        assert_eq!(engine.state(), SessionState::Open);
    }

    #[test]
    fn test_release_on_nested_item_cancels() {
        let mut engine = nested_engine(false);
        let data = StaticCatalog::permissive();

        engine.tick(&held(combo("Ctrl+1"), CENTER), &data);
        engine.tick(&held(combo("Ctrl+1"), at(90.0)), &data);
        assert_eq!(
            engine.tick(&idle(at(90.0)), &data),
            vec![closed(0, CloseReason::Cancelled)]
        );
    }

    #[test]
    fn test_click_outcomes() {
        let data = StaticCatalog::permissive();
        let press = combo("Ctrl+1");
        let click = |cursor| InputSnapshot {
            clicked: true,
            ..held(press, cursor)
        };

        let mut engine = nested_engine(false);
        engine.tick(&held(press, CENTER), &data);
        assert!(matches!(
            engine.tick(&click(at(90.0)), &data)[..],
            [RingEvent::NestedActivated { ring: 1, .. }]
        ));

        let mut engine = nested_engine(false);
        engine.tick(&held(press, CENTER), &data);
        assert_eq!(
            engine.tick(&click(at(270.0)), &data),
            vec![commit(0, 1), closed(0, CloseReason::Committed)]
        );

        let mut engine = nested_engine(false);
        engine.tick(&held(press, CENTER), &data);
        assert_eq!(
            engine.tick(&click(CENTER), &data),
            vec![closed(0, CloseReason::Cancelled)]
        );
    }

    #[test]
    fn test_fixed_center_warps_cursor() {
        let mut engine = engine(vec![ring("Main", KeyBind::new(combo("Ctrl+1")), commands(2))]);
        {
            let settings = engine.settings_mut();
            settings.appear_at_cursor = false;
            settings.auto_center_cursor = true;
        }
        let input = InputSnapshot {
            viewport: Point::new(1000.0, 800.0),
            ..held(combo("Ctrl+1"), Point::new(10.0, 10.0))
        };
        let center = Point::new(500.0, 400.0);
        assert_eq!(
            engine.tick(&input, &StaticCatalog::permissive()),
            vec![
                RingEvent::Activated { ring: 0, center },
                RingEvent::WarpCursor(center)
            ]
        );
    }

    #[test]
    fn test_editing_rings_cancels_session() {
        let mut engine = engine(vec![ring("Main", KeyBind::new(combo("Ctrl+1")), commands(2))]);
        engine.tick(&held(combo("Ctrl+1"), CENTER), &StaticCatalog::permissive());
        assert_eq!(engine.state(), SessionState::Open);

        engine.rings_mut().add_new_ring();
        assert_eq!(engine.state(), SessionState::Closed);
        assert_eq!(engine.rings().len(), 2);

        engine.tick(&held(combo("Ctrl+1"), CENTER), &StaticCatalog::permissive());
        assert_eq!(
            engine.replace_settings(Settings::default()),
            Some(closed(0, CloseReason::Cancelled))
        );
    }

    #[test]
    fn test_blocks_input_unless_passthrough() {
        let mut engine = engine(vec![ring("Main", KeyBind::new(combo("Ctrl+1")), commands(2))]);
        let input = held(combo("Ctrl+1"), CENTER);
        assert!(engine.blocks_input(&input));
        assert!(!engine.blocks_input(&idle(CENTER)));

        engine.settings_mut().keybind_passthrough = true;
        assert!(!engine.blocks_input(&input));
    }

    #[derive(Default)]
    struct Recorder(Vec<ExecutePayload>);

    impl Executor for Recorder {
        fn execute(&mut self, payload: &ExecutePayload) {
            self.0.push(payload.clone());
        }
    }

    #[test]
    fn test_dispatch_commits_forwards_payloads() {
        let events = vec![
            RingEvent::Activated {
                ring: 0,
                center: CENTER,
            },
            commit(0, 3),
            closed(0, CloseReason::Committed),
        ];
        let mut recorder = Recorder::default();
        assert_eq!(dispatch_commits(&events, &mut recorder), 1);
        assert_eq!(
            recorder.0,
            vec![ExecutePayload::RunCommand {
                command: "/echo 3".to_string()
            }]
        );
    }

    #[test]
    fn test_releasing_extra_modifier_triggers() {
        let mut engine = engine(vec![ring(
            "Main",
            KeyBind::new(KeyCombo::new(Modifiers::NONE, Key::F5)),
            commands(2),
        )]);
        let data = StaticCatalog::permissive();
        engine.tick(&held(combo("Ctrl+F5"), CENTER), &data);
        assert_eq!(engine.state(), SessionState::Closed);

        // dropping Ctrl while F5 stays down makes the combo satisfied for the first time
        engine.tick(&held(combo("F5"), CENTER), &data);
        assert_eq!(engine.state(), SessionState::Open);
    }
}
