use crate::audio::{SharedRegistry, SharedSound, SoundOpener};
use crate::catalog::{CatalogError, SoundCatalog};
use crate::model::{ListRow, POS_UNKNOWN, PickerConfig, PickerResult, SavedSession, SoundUri};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const SELECTION_PLAY_DELAY: Duration = Duration::from_millis(300);

pub fn to_catalog_pos(list_pos: isize, static_count: isize) -> isize {
    list_pos - static_count
}

pub fn to_list_pos(catalog_pos: isize, static_count: isize) -> isize {
    // A not-found sentinel passes through without the static-row offset.
    if catalog_pos < 0 {
        catalog_pos
    } else {
        catalog_pos + static_count
    }
}

pub struct PickerCore {
    pub config: PickerConfig,
    catalog: Box<dyn SoundCatalog>,
    opener: Rc<dyn SoundOpener>,
    registry: SharedRegistry,
    pub rows: Vec<ListRow>,
    static_count: isize,
    pub clicked_pos: isize,
    sample_pos: isize,
    preview_due: Option<Instant>,
    default_handle: Option<SharedSound>,
    current_handle: Option<SharedSound>,
    result: Option<PickerResult>,
    pub finished: bool,
    pub status: String,
    pub dirty: bool,
}

impl PickerCore {
    pub fn open(
        config: PickerConfig,
        mut catalog: Box<dyn SoundCatalog>,
        opener: Rc<dyn SoundOpener>,
        registry: SharedRegistry,
        restored: Option<SavedSession>,
    ) -> Self {
        catalog.set_category(config.category);

        let mut rows = Vec::new();
        if config.show_default {
            rows.push(ListRow::Default {
                label: config.default_label.clone(),
            });
        }
        if config.show_silent {
            rows.push(ListRow::Silent {
                label: config.silent_label.clone(),
            });
        }
        let static_count = rows.len() as isize;
        for entry in catalog.candidates() {
            rows.push(ListRow::Sound {
                uri: entry.uri,
                label: entry.label,
            });
        }

        let sound_count = rows.len() - static_count as usize;
        let mut core = Self {
            config,
            catalog,
            opener,
            registry,
            status: format!("{sound_count} sounds"),
            rows,
            static_count,
            clicked_pos: restored.map_or(POS_UNKNOWN, |session| session.clicked_pos),
            sample_pos: POS_UNKNOWN,
            preview_due: None,
            default_handle: None,
            current_handle: None,
            result: None,
            finished: false,
            dirty: true,
        };
        core.resolve_initial_checked();

        // In the buttonless variant the result is set preemptively; there is
        // no later confirmation step.
        if !core.config.show_ok_cancel {
            core.set_result_from_selection();
        }
        core
    }

    pub fn static_count(&self) -> isize {
        self.static_count
    }

    pub fn default_row_pos(&self) -> isize {
        self.rows
            .iter()
            .position(|row| matches!(row, ListRow::Default { .. }))
            .map_or(POS_UNKNOWN, |idx| idx as isize)
    }

    pub fn silent_row_pos(&self) -> isize {
        self.rows
            .iter()
            .position(|row| matches!(row, ListRow::Silent { .. }))
            .map_or(POS_UNKNOWN, |idx| idx as isize)
    }

    pub fn result(&self) -> Option<PickerResult> {
        self.result.clone()
    }

    pub fn has_pending_preview(&self) -> bool {
        self.preview_due.is_some()
    }

    pub fn on_row_clicked(&mut self, pos: isize, now: Instant) {
        self.clicked_pos = pos;
        if !self.config.show_ok_cancel {
            self.set_result_from_selection();
        }
        self.request_preview(pos, Duration::ZERO, now);
        self.dirty = true;
    }

    pub fn on_row_highlighted(&mut self, pos: isize, now: Instant) {
        self.clicked_pos = pos;
        self.request_preview(pos, SELECTION_PLAY_DELAY, now);
        if !self.config.show_ok_cancel {
            self.set_result_from_selection();
        }
        self.dirty = true;
    }

    pub fn on_confirm(&mut self, accepted: bool) {
        self.stop_any_playing();
        if accepted {
            self.set_result_from_selection();
        } else {
            self.result = Some(PickerResult::Cancelled);
        }
        self.finished = true;
        self.dirty = true;
    }

    pub fn on_session_pause(&mut self, retaining: bool) {
        if !retaining {
            self.stop_any_playing();
        }
    }

    pub fn on_session_stop(&mut self, retaining: bool) {
        self.preview_due = None;
        self.catalog.deactivate();

        if retaining {
            self.save_any_playing();
        } else {
            self.stop_any_playing();
        }
    }

    pub fn save_session(&self) -> SavedSession {
        SavedSession {
            clicked_pos: self.clicked_pos,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if self.preview_due.is_some_and(|due| due <= now) {
            self.preview_due = None;
            self.play_sample();
        }
    }

    fn resolve_initial_checked(&mut self) {
        if self.clicked_pos == POS_UNKNOWN
            && self.default_row_pos() != POS_UNKNOWN
            && self
                .config
                .existing_uri
                .as_ref()
                .is_some_and(SoundUri::is_default)
        {
            self.clicked_pos = self.default_row_pos();
        }

        if self.clicked_pos == POS_UNKNOWN
            && self.silent_row_pos() != POS_UNKNOWN
            && self.config.existing_uri.is_none()
        {
            self.clicked_pos = self.silent_row_pos();
        }

        if self.clicked_pos == POS_UNKNOWN {
            let native = self
                .config
                .existing_uri
                .as_ref()
                .map_or(POS_UNKNOWN, |uri| self.catalog.position_of(uri));
            self.clicked_pos = to_list_pos(native, self.static_count);
        }
    }

    // A new request replaces any still-pending one; at most one preview
    // timer exists at a time.
    fn request_preview(&mut self, pos: isize, delay: Duration, now: Instant) {
        self.sample_pos = pos;
        self.preview_due = Some(now + delay);
    }

    fn play_sample(&mut self) {
        self.stop_any_playing();

        if self.sample_pos == self.silent_row_pos() {
            self.set_status("Silent");
            return;
        }

        let handle = if self.sample_pos == self.default_row_pos() {
            if self.default_handle.is_none() {
                self.default_handle = self.opener.open(&self.config.default_uri);
            }
            // The default sound is not managed by the catalog, so its stream
            // routing is applied here and it is tracked apart from
            // current_handle.
            if let Some(default_handle) = &self.default_handle {
                default_handle.set_stream(self.catalog.preferred_stream());
            }
            self.current_handle = None;
            self.default_handle.clone()
        } else {
            let native = to_catalog_pos(self.sample_pos, self.static_count);
            let handle = match self.catalog.handle_at(native) {
                Ok(handle) => Some(handle),
                Err(err @ (CatalogError::StaleData | CatalogError::InvalidState)) => {
                    debug!("no sample at catalog position {native}: {err}");
                    None
                }
            };
            self.current_handle = handle.clone();
            handle
        };

        if let Some(handle) = handle {
            if self.config.attribute_flags != 0 {
                handle.set_attribute_flags(self.config.attribute_flags);
            }
            handle.play();
            let label = usize::try_from(self.sample_pos)
                .ok()
                .and_then(|idx| self.rows.get(idx))
                .map(|row| row.label().to_string())
                .unwrap_or_default();
            self.set_status(&format!("Previewing {label}"));
        }
    }

    fn stop_any_playing(&mut self) {
        self.registry.borrow_mut().stop_and_clear();

        if let Some(default_handle) = &self.default_handle
            && default_handle.is_playing()
        {
            default_handle.stop();
        }

        self.catalog.stop_current();
    }

    fn save_any_playing(&mut self) {
        if let Some(default_handle) = &self.default_handle
            && default_handle.is_playing()
        {
            self.registry.borrow_mut().put(Rc::clone(default_handle));
        } else if let Some(current) = &self.current_handle
            && current.is_playing()
        {
            self.registry.borrow_mut().put(Rc::clone(current));
        }
    }

    fn set_result_from_selection(&mut self) {
        let uri = if self.clicked_pos == self.default_row_pos() {
            // The default indirection id itself, not a resolved sound path.
            Some(self.config.default_uri.clone())
        } else if self.clicked_pos == self.silent_row_pos() {
            None
        } else {
            self.catalog
                .uri_at(to_catalog_pos(self.clicked_pos, self.static_count))
        };

        self.result = if uri == self.config.existing_uri {
            Some(PickerResult::Cancelled)
        } else {
            Some(PickerResult::Accepted { uri })
        };
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{PlaybackRegistry, SoundHandle, shared_registry};
    use crate::catalog::{MemoryCatalog, SoundEntry};
    use crate::localize::ResourceTable;
    use crate::model::{FLAG_AUDIBILITY_ENFORCED, PickerRequest, SoundCategory, StreamKind};
    use proptest::prop_assert;
    use std::cell::{Cell, RefCell};

    struct TestHandle {
        uri: SoundUri,
        playing: Cell<bool>,
        plays: Cell<u32>,
        flags: Cell<u32>,
        stream: Cell<Option<StreamKind>>,
    }

    impl TestHandle {
        fn new(uri: SoundUri) -> Self {
            Self {
                uri,
                playing: Cell::new(false),
                plays: Cell::new(0),
                flags: Cell::new(0),
                stream: Cell::new(None),
            }
        }
    }

    impl SoundHandle for TestHandle {
        fn play(&self) {
            self.plays.set(self.plays.get() + 1);
            self.playing.set(true);
        }

        fn stop(&self) {
            self.playing.set(false);
        }

        fn is_playing(&self) -> bool {
            self.playing.get()
        }

        fn set_stream(&self, stream: StreamKind) {
            self.stream.set(Some(stream));
        }

        fn set_attribute_flags(&self, flags: u32) {
            self.flags.set(flags);
        }
    }

    #[derive(Default)]
    struct TestOpener {
        issued: RefCell<Vec<Rc<TestHandle>>>,
    }

    impl TestOpener {
        fn issued(&self) -> Vec<Rc<TestHandle>> {
            self.issued.borrow().clone()
        }

        fn total_plays(&self) -> u32 {
            self.issued.borrow().iter().map(|h| h.plays.get()).sum()
        }

        fn playing_count(&self) -> usize {
            self.issued
                .borrow()
                .iter()
                .filter(|h| h.is_playing())
                .count()
        }

        fn opens_of(&self, uri: &SoundUri) -> usize {
            self.issued
                .borrow()
                .iter()
                .filter(|h| h.uri == *uri)
                .count()
        }
    }

    impl SoundOpener for TestOpener {
        fn open(&self, uri: &SoundUri) -> Option<SharedSound> {
            let handle = Rc::new(TestHandle::new(uri.clone()));
            self.issued.borrow_mut().push(Rc::clone(&handle));
            Some(handle)
        }
    }

    fn sound_entries(count: usize) -> Vec<SoundEntry> {
        (0..count)
            .map(|idx| SoundEntry {
                uri: SoundUri::new(format!("file:///sounds/tone_{idx}.ogg")),
                label: format!("Tone {idx}"),
            })
            .collect()
    }

    fn config_for(request: PickerRequest) -> PickerConfig {
        PickerConfig::from_request(request, &ResourceTable::builtin())
    }

    struct Session {
        core: PickerCore,
        opener: Rc<TestOpener>,
        registry: SharedRegistry,
        now: Instant,
    }

    impl Session {
        fn open(request: PickerRequest, sounds: usize) -> Self {
            Self::open_restored(request, sounds, None)
        }

        fn open_restored(
            request: PickerRequest,
            sounds: usize,
            restored: Option<SavedSession>,
        ) -> Self {
            let opener = Rc::new(TestOpener::default());
            let registry = shared_registry();
            let catalog = MemoryCatalog::new(
                sound_entries(sounds),
                Rc::clone(&opener) as Rc<dyn SoundOpener>,
            );
            let core = PickerCore::open(
                config_for(request),
                Box::new(catalog),
                Rc::clone(&opener) as Rc<dyn SoundOpener>,
                Rc::clone(&registry),
                restored,
            );
            Self {
                core,
                opener,
                registry,
                now: Instant::now(),
            }
        }

        fn advance(&mut self, delay: Duration) {
            self.now += delay;
            self.core.tick(self.now);
        }
    }

    #[test]
    fn rows_are_default_silent_then_sounds() {
        let session = Session::open(PickerRequest::default(), 3);
        assert_eq!(session.core.static_count(), 2);
        assert!(matches!(session.core.rows[0], ListRow::Default { .. }));
        assert!(matches!(session.core.rows[1], ListRow::Silent { .. }));
        assert!(matches!(session.core.rows[2], ListRow::Sound { .. }));
        assert_eq!(session.core.rows.len(), 5);
    }

    #[test]
    fn conversion_round_trips_and_keeps_sentinel() {
        assert_eq!(to_list_pos(to_catalog_pos(4, 2), 2), 4);
        assert_eq!(to_list_pos(POS_UNKNOWN, 2), POS_UNKNOWN);
        assert_eq!(to_list_pos(-7, 2), -7);
        assert_eq!(to_catalog_pos(2, 2), 0);
    }

    #[test]
    fn existing_default_uri_checks_default_row() {
        let session = Session::open(
            PickerRequest {
                existing_uri: Some(SoundUri::new("default:ringtone")),
                ..PickerRequest::default()
            },
            3,
        );
        assert_eq!(session.core.clicked_pos, session.core.default_row_pos());
    }

    #[test]
    fn absent_existing_uri_checks_silent_row() {
        // The Default rule is evaluated first but does not match an absent
        // uri, so the Silent rule decides.
        let session = Session::open(
            PickerRequest {
                category: SoundCategory::Notification,
                existing_uri: None,
                ..PickerRequest::default()
            },
            3,
        );
        assert_eq!(session.core.clicked_pos, session.core.silent_row_pos());
        assert_eq!(session.core.clicked_pos, 1);
    }

    #[test]
    fn existing_sound_uri_checks_offset_row() {
        let session = Session::open(
            PickerRequest {
                existing_uri: Some(SoundUri::new("file:///sounds/tone_1.ogg")),
                ..PickerRequest::default()
            },
            3,
        );
        assert_eq!(session.core.clicked_pos, 2 + 1);
    }

    #[test]
    fn unknown_existing_uri_leaves_sentinel() {
        let session = Session::open(
            PickerRequest {
                show_default: false,
                show_silent: false,
                existing_uri: Some(SoundUri::new("file:///sounds/gone.ogg")),
                ..PickerRequest::default()
            },
            3,
        );
        assert_eq!(session.core.clicked_pos, POS_UNKNOWN);
    }

    #[test]
    fn restored_click_wins_over_existing_uri() {
        let session = Session::open_restored(
            PickerRequest {
                existing_uri: Some(SoundUri::new("default:ringtone")),
                ..PickerRequest::default()
            },
            3,
            Some(SavedSession { clicked_pos: 4 }),
        );
        assert_eq!(session.core.clicked_pos, 4);
    }

    #[test]
    fn confirming_unchanged_selection_cancels() {
        let mut session = Session::open(
            PickerRequest {
                existing_uri: Some(SoundUri::new("file:///sounds/tone_0.ogg")),
                ..PickerRequest::default()
            },
            3,
        );
        assert_eq!(session.core.clicked_pos, 2);
        session.core.on_confirm(true);
        assert_eq!(session.core.result(), Some(PickerResult::Cancelled));
        assert!(session.core.finished);
    }

    #[test]
    fn confirming_new_selection_accepts_with_uri() {
        let mut session = Session::open(
            PickerRequest {
                existing_uri: Some(SoundUri::new("file:///sounds/tone_0.ogg")),
                ..PickerRequest::default()
            },
            3,
        );
        let now = session.now;
        session.core.on_row_clicked(3, now);
        session.core.on_confirm(true);
        assert_eq!(
            session.core.result(),
            Some(PickerResult::Accepted {
                uri: Some(SoundUri::new("file:///sounds/tone_1.ogg"))
            })
        );
    }

    #[test]
    fn silent_selection_accepts_with_absent_uri() {
        let mut session = Session::open(
            PickerRequest {
                existing_uri: Some(SoundUri::new("file:///sounds/tone_0.ogg")),
                ..PickerRequest::default()
            },
            3,
        );
        let silent = session.core.silent_row_pos();
        let now = session.now;
        session.core.on_row_clicked(silent, now);
        session.core.on_confirm(true);
        assert_eq!(
            session.core.result(),
            Some(PickerResult::Accepted { uri: None })
        );
    }

    #[test]
    fn default_selection_returns_indirection_uri() {
        let mut session = Session::open(
            PickerRequest {
                category: SoundCategory::Alarm,
                existing_uri: Some(SoundUri::new("file:///sounds/tone_0.ogg")),
                ..PickerRequest::default()
            },
            3,
        );
        let default_row = session.core.default_row_pos();
        let now = session.now;
        session.core.on_row_clicked(default_row, now);
        session.core.on_confirm(true);
        assert_eq!(
            session.core.result(),
            Some(PickerResult::Accepted {
                uri: Some(SoundUri::new("default:alarm"))
            })
        );
    }

    #[test]
    fn declined_confirm_cancels() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_clicked(2, now);
        session.core.on_confirm(false);
        assert_eq!(session.core.result(), Some(PickerResult::Cancelled));
    }

    #[test]
    fn click_previews_on_next_tick() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_clicked(2, now);
        assert_eq!(session.opener.total_plays(), 0);
        session.advance(Duration::ZERO);
        assert_eq!(session.opener.total_plays(), 1);
    }

    #[test]
    fn highlight_waits_for_debounce_delay() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_highlighted(2, now);
        session.advance(Duration::from_millis(100));
        assert_eq!(session.opener.total_plays(), 0);
        session.advance(Duration::from_millis(250));
        assert_eq!(session.opener.total_plays(), 1);
    }

    #[test]
    fn second_preview_request_replaces_pending_one() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_highlighted(2, now);
        session.advance(Duration::from_millis(100));
        let now = session.now;
        session.core.on_row_highlighted(3, now);
        session.advance(Duration::from_millis(350));

        assert_eq!(session.opener.total_plays(), 1);
        let issued = session.opener.issued();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].uri, SoundUri::new("file:///sounds/tone_1.ogg"));
    }

    #[test]
    fn new_sample_stops_previous_playback() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_clicked(2, now);
        session.advance(Duration::ZERO);
        let now = session.now;
        session.core.on_row_clicked(3, now);
        session.advance(Duration::ZERO);

        assert_eq!(session.opener.playing_count(), 1);
        let issued = session.opener.issued();
        assert!(!issued[0].is_playing());
        assert!(issued[1].is_playing());
    }

    #[test]
    fn silent_row_preview_plays_nothing() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let silent = session.core.silent_row_pos();
        let now = session.now;
        session.core.on_row_clicked(silent, now);
        session.advance(Duration::ZERO);
        assert_eq!(session.opener.total_plays(), 0);
    }

    #[test]
    fn default_handle_is_created_once_and_routed() {
        let mut session = Session::open(
            PickerRequest {
                category: SoundCategory::Notification,
                ..PickerRequest::default()
            },
            3,
        );
        let default_row = session.core.default_row_pos();
        let default_uri = SoundUri::new("default:notification");

        let now = session.now;
        session.core.on_row_clicked(default_row, now);
        session.advance(Duration::ZERO);
        let now = session.now;
        session.core.on_row_clicked(default_row, now);
        session.advance(Duration::ZERO);

        assert_eq!(session.opener.opens_of(&default_uri), 1);
        let issued = session.opener.issued();
        assert_eq!(issued[0].stream.get(), Some(StreamKind::Notification));
        assert_eq!(issued[0].plays.get(), 2);
    }

    #[test]
    fn attribute_flags_are_applied_before_playing() {
        let mut session = Session::open(
            PickerRequest {
                attribute_flags: FLAG_AUDIBILITY_ENFORCED,
                ..PickerRequest::default()
            },
            3,
        );
        let now = session.now;
        session.core.on_row_clicked(2, now);
        session.advance(Duration::ZERO);
        assert_eq!(
            session.opener.issued()[0].flags.get(),
            FLAG_AUDIBILITY_ENFORCED
        );
    }

    #[test]
    fn zero_flags_are_not_applied() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_clicked(2, now);
        session.advance(Duration::ZERO);
        assert_eq!(session.opener.issued()[0].flags.get(), 0);
    }

    #[test]
    fn stale_catalog_degrades_to_silence() {
        let mut session = Session::open(PickerRequest::default(), 3);
        session.core.on_session_stop(true);

        let now = session.now;
        session.core.on_row_clicked(2, now);
        session.advance(Duration::ZERO);
        assert_eq!(session.opener.total_plays(), 0);
        assert!(session.core.result().is_none());
    }

    #[test]
    fn retaining_stop_parks_playing_handle_in_registry() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_clicked(2, now);
        session.advance(Duration::ZERO);
        assert_eq!(session.opener.playing_count(), 1);

        session.core.on_session_stop(true);
        assert!(session.registry.borrow().is_occupied());
        assert_eq!(session.opener.playing_count(), 1);
    }

    #[test]
    fn retained_handle_is_stopped_by_next_session_preview() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_clicked(2, now);
        session.advance(Duration::ZERO);
        let saved = session.core.save_session();
        session.core.on_session_stop(true);
        let survivor = session.opener.issued()[0].clone();
        assert!(survivor.is_playing());

        let catalog = MemoryCatalog::new(
            sound_entries(3),
            Rc::clone(&session.opener) as Rc<dyn SoundOpener>,
        );
        let mut next = PickerCore::open(
            config_for(PickerRequest::default()),
            Box::new(catalog),
            Rc::clone(&session.opener) as Rc<dyn SoundOpener>,
            Rc::clone(&session.registry),
            Some(saved),
        );
        assert_eq!(next.clicked_pos, 2);

        let now = Instant::now();
        next.on_row_clicked(3, now);
        next.tick(now);
        assert!(!survivor.is_playing());
        assert!(!session.registry.borrow().is_occupied());
    }

    #[test]
    fn non_retaining_stop_and_pause_stop_playback() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_clicked(2, now);
        session.advance(Duration::ZERO);

        session.core.on_session_pause(true);
        assert_eq!(session.opener.playing_count(), 1);

        session.core.on_session_pause(false);
        assert_eq!(session.opener.playing_count(), 0);

        let now = session.now;
        session.core.on_row_clicked(2, now);
        session.advance(Duration::ZERO);
        session.core.on_session_stop(false);
        assert_eq!(session.opener.playing_count(), 0);
        assert!(!session.registry.borrow().is_occupied());
    }

    #[test]
    fn session_stop_cancels_pending_preview() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_highlighted(2, now);
        assert!(session.core.has_pending_preview());
        session.core.on_session_stop(false);
        assert!(!session.core.has_pending_preview());
        session.advance(Duration::from_millis(400));
        assert_eq!(session.opener.total_plays(), 0);
    }

    #[test]
    fn buttonless_session_sets_result_preemptively() {
        let mut session = Session::open(
            PickerRequest {
                show_ok_cancel: false,
                existing_uri: None,
                ..PickerRequest::default()
            },
            3,
        );
        // Checked row is Silent and the existing uri is absent, so the
        // preemptive result reports no change.
        assert_eq!(session.core.result(), Some(PickerResult::Cancelled));

        let now = session.now;
        session.core.on_row_clicked(2, now);
        assert_eq!(
            session.core.result(),
            Some(PickerResult::Accepted {
                uri: Some(SoundUri::new("file:///sounds/tone_0.ogg"))
            })
        );

        let now = session.now;
        session.core.on_row_highlighted(3, now);
        assert_eq!(
            session.core.result(),
            Some(PickerResult::Accepted {
                uri: Some(SoundUri::new("file:///sounds/tone_1.ogg"))
            })
        );
    }

    #[test]
    fn save_session_round_trips_clicked_pos() {
        let mut session = Session::open(PickerRequest::default(), 3);
        let now = session.now;
        session.core.on_row_clicked(4, now);
        assert_eq!(session.core.save_session(), SavedSession { clicked_pos: 4 });
    }

    proptest::proptest! {
        #[test]
        fn sentinels_pass_through_to_list_pos(pos in -100isize..0, statics in 0isize..4) {
            prop_assert!(to_list_pos(pos, statics) == pos);
        }

        #[test]
        fn conversion_round_trips(pos in 0isize..1000, statics in 0isize..4) {
            prop_assert!(to_catalog_pos(to_list_pos(pos, statics), statics) == pos);
        }

        #[test]
        fn invariants_hold_after_random_ops(ops in proptest::collection::vec((0u8..6, 0isize..5), 1..60)) {
            let mut session = Session::open(PickerRequest::default(), 3);
            for (op, pos) in ops {
                let now = session.now;
                match op {
                    0 => session.core.on_row_clicked(pos, now),
                    1 => session.core.on_row_highlighted(pos, now),
                    2 => session.advance(Duration::from_millis(350)),
                    3 => session.core.on_session_pause(false),
                    4 => session.core.on_session_stop(true),
                    _ => {
                        // Rebuild after a retaining stop, the way a host would.
                        let saved = session.core.save_session();
                        session.core.on_session_stop(true);
                        let catalog = MemoryCatalog::new(
                            sound_entries(3),
                            Rc::clone(&session.opener) as Rc<dyn SoundOpener>,
                        );
                        session.core = PickerCore::open(
                            config_for(PickerRequest::default()),
                            Box::new(catalog),
                            Rc::clone(&session.opener) as Rc<dyn SoundOpener>,
                            Rc::clone(&session.registry),
                            Some(saved),
                        );
                    }
                }

                let clicked = session.core.clicked_pos;
                prop_assert!(clicked == POS_UNKNOWN || (clicked >= 0 && (clicked as usize) < session.core.rows.len()));
                prop_assert!(session.opener.playing_count() <= 1);
            }
        }
    }

    #[test]
    fn registry_handoff_is_explicit_context() {
        // The registry is plain injected state, not a process global.
        let mut registry = PlaybackRegistry::new();
        assert!(registry.take().is_none());
        registry.stop_and_clear();
    }
}
