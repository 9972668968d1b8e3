#![no_main]

use chime::audio::{NullOpener, SoundOpener, shared_registry};
use chime::catalog::{MemoryCatalog, SoundEntry};
use chime::core::PickerCore;
use chime::localize::ResourceTable;
use chime::model::{POS_UNKNOWN, PickerConfig, PickerRequest, SoundUri};
use libfuzzer_sys::fuzz_target;
use std::rc::Rc;
use std::time::{Duration, Instant};

fuzz_target!(|data: &[u8]| {
    let opener: Rc<dyn SoundOpener> = Rc::new(NullOpener::new());
    let entries: Vec<SoundEntry> = (0..(data.len() % 8))
        .map(|idx| SoundEntry {
            uri: SoundUri::new(format!("file:///sounds/tone_{idx}.ogg")),
            label: format!("tone_{idx}"),
        })
        .collect();
    let catalog = MemoryCatalog::new(entries, Rc::clone(&opener));
    let config = PickerConfig::from_request(PickerRequest::default(), &ResourceTable::builtin());
    let mut core = PickerCore::open(config, Box::new(catalog), opener, shared_registry(), None);

    let mut now = Instant::now();
    for byte in data {
        let pos = (*byte / 16) as isize - 2;
        match byte % 7 {
            0 => core.on_row_clicked(pos, now),
            1 => core.on_row_highlighted(pos, now),
            2 => {
                now += Duration::from_millis(350);
                core.tick(now);
            }
            3 => core.on_session_pause(byte % 2 == 0),
            4 => core.on_session_stop(byte % 2 == 0),
            5 => {
                let _ = core.save_session();
            }
            _ => {
                now += Duration::from_millis(50);
                core.tick(now);
            }
        }

        assert!(core.clicked_pos == POS_UNKNOWN || core.clicked_pos >= -2);
    }
});
