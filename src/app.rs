use crate::audio::{NullOpener, RodioOpener, SharedRegistry, SoundOpener, shared_registry};
use crate::catalog::FsCatalog;
use crate::config;
use crate::core::PickerCore;
use crate::localize::{LocalizedCatalog, NameLocalizer, ResourceTable};
use crate::model::{POS_UNKNOWN, PickerConfig, PickerRequest, PickerResult, SavedSession};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub struct AppStartupOptions {
    pub request: PickerRequest,
    pub extra_folders: Vec<PathBuf>,
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<Option<PickerResult>> {
    let state = config::load_state()?;
    let mut folders = state.folders.clone();
    for folder in options.extra_folders {
        if !folders.contains(&folder) {
            folders.push(folder);
        }
    }

    let table = config::load_resource_table().unwrap_or_else(|err| {
        tracing::warn!("falling back to builtin strings: {err:#}");
        ResourceTable::builtin()
    });

    let opener: Rc<dyn SoundOpener> = match RodioOpener::new(state.default_sounds.clone()) {
        Ok(engine) => Rc::new(engine),
        Err(err) => {
            tracing::warn!("audio output unavailable, previews disabled: {err:#}");
            Rc::new(NullOpener::new())
        }
    };
    let registry = shared_registry();
    let config = PickerConfig::from_request(options.request, &table);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_session(&mut terminal, config, folders, table, opener, registry);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn build_core(
    config: &PickerConfig,
    folders: &[PathBuf],
    table: &ResourceTable,
    opener: &Rc<dyn SoundOpener>,
    registry: &SharedRegistry,
    restored: Option<SavedSession>,
) -> PickerCore {
    let catalog = LocalizedCatalog::new(
        FsCatalog::new(folders.to_vec(), Rc::clone(opener)),
        NameLocalizer::new(table.clone()),
    );
    PickerCore::open(
        config.clone(),
        Box::new(catalog),
        Rc::clone(opener),
        Rc::clone(registry),
        restored,
    )
}

fn run_session(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    config: PickerConfig,
    folders: Vec<PathBuf>,
    table: ResourceTable,
    opener: Rc<dyn SoundOpener>,
    registry: SharedRegistry,
) -> Result<Option<PickerResult>> {
    let mut core = build_core(&config, &folders, &table, &opener, &registry, None);
    let mut cursor = clamped_cursor(core.clicked_pos, core.rows.len());
    let mut last_tick = Instant::now();

    loop {
        core.tick(Instant::now());

        if core.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| crate::ui::draw(frame, &core, cursor))?;
            core.dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let event = event::read()?;
        if let Event::Mouse(mouse) = event {
            handle_mouse(&mut core, &mut cursor, mouse);
            if core.finished {
                break;
            }
            continue;
        }

        let Event::Key(key) = event else {
            continue;
        };

        if key.kind != KeyEventKind::Press {
            continue;
        }

        let now = Instant::now();
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                core.on_confirm(false);
            }
            KeyCode::Down => {
                let next = (cursor + 1).min(core.rows.len().saturating_sub(1));
                if !core.rows.is_empty() && next != cursor {
                    cursor = next;
                    core.on_row_highlighted(cursor as isize, now);
                }
            }
            KeyCode::Up => {
                let next = cursor.saturating_sub(1);
                if !core.rows.is_empty() && next != cursor {
                    cursor = next;
                    core.on_row_highlighted(cursor as isize, now);
                }
            }
            KeyCode::Char(' ') => {
                if !core.rows.is_empty() {
                    core.on_row_clicked(cursor as isize, now);
                }
            }
            KeyCode::Enter => {
                if core.config.show_ok_cancel {
                    core.on_confirm(true);
                } else {
                    // Buttonless sessions already carry their result.
                    core.finished = true;
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => core.on_confirm(false),
            KeyCode::Char('r') => {
                // The reconfiguration event: keep audio alive across the
                // teardown, rebuild from a fresh catalog, restore the click.
                let saved = core.save_session();
                core.on_session_stop(true);
                core = build_core(&config, &folders, &table, &opener, &registry, Some(saved));
                cursor = clamped_cursor(core.clicked_pos, core.rows.len());
            }
            _ => {}
        }

        if core.finished {
            break;
        }
    }

    let result = core.result();
    core.on_session_pause(false);
    core.on_session_stop(false);
    Ok(result)
}

fn handle_mouse(core: &mut PickerCore, cursor: &mut usize, mouse: MouseEvent) {
    if core.rows.is_empty() {
        return;
    }

    let now = Instant::now();
    let next = match mouse.kind {
        MouseEventKind::ScrollDown => (*cursor + 1).min(core.rows.len() - 1),
        MouseEventKind::ScrollUp => cursor.saturating_sub(1),
        _ => return,
    };
    if next != *cursor {
        *cursor = next;
        core.on_row_highlighted(*cursor as isize, now);
    }
}

fn clamped_cursor(clicked_pos: isize, rows: usize) -> usize {
    if rows == 0 {
        return 0;
    }
    if clicked_pos == POS_UNKNOWN {
        return 0;
    }
    usize::try_from(clicked_pos)
        .unwrap_or(0)
        .min(rows - 1)
}
