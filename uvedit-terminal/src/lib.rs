/// Terminal frontend for the textured mesh previewer and UV editor
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use log::{info, warn};
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uvedit_core::{
    expand_selection, obj, render_uv_view, AdjacencyGraph, EditorEvent, EventQueue, Framebuffer,
    Mesh, OrbitCamera, Picker, RenderMode, Renderer, Selection, Texture, TransformMode, UvEditor,
};

pub mod surface;

pub use surface::HalfBlockSurface;

/// Redraw cadence: pending mutations are flushed into at most one render
/// pass per tick (~60 frames per second).
const TICK: Duration = Duration::from_millis(16);

/// Radians of orbit per pixel of drag.
const ORBIT_PER_PIXEL: f32 = 0.01;

/// Pixel radius for vertex picking in the UV pane.
const VERTEX_PICK_RADIUS: f32 = 4.0;

/// Which pane a mouse position falls in, with pane-relative pixel coords.
#[derive(Debug, Clone, Copy)]
enum Pane {
    View3d { x: i32, y: i32 },
    UvEditor { x: f32, y: f32 },
    Divider,
}

/// Pointer drag in flight.
#[derive(Debug, Clone, Copy)]
enum Drag {
    Orbit { last: (i32, i32) },
    UvTransform { start: (f32, f32) },
    UvPan { last: (f32, f32) },
    UvBox { start: (f32, f32), current: (f32, f32) },
}

/// Main application struct for the two-pane terminal editor.
///
/// Everything runs on one thread: input events mutate state and set a dirty
/// flag, and a periodic tick turns a pending flag into one actual render.
pub struct TerminalApp {
    mesh: Mesh,
    texture: Texture,
    camera: OrbitCamera,
    renderer: Renderer,
    picker: Picker,
    adjacency: Option<AdjacencyGraph>,
    viewer_selection: Selection,
    editor: UvEditor,
    events: EventQueue,
    view_fb: Framebuffer,
    uv_fb: Framebuffer,
    surface: HalfBlockSurface,
    export_path: PathBuf,
    running: bool,
    dirty: bool,
    drag: Option<Drag>,
}

impl TerminalApp {
    pub fn new(mesh: Mesh, texture: Texture) -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        let (left_w, right_w, height) = pane_layout(cols, rows);

        let adjacency = build_adjacency(&mesh);
        let mut editor = UvEditor::new(right_w as u32, height as u32);
        editor.reset_for_mesh();

        Ok(Self {
            mesh,
            texture,
            camera: OrbitCamera::new(),
            renderer: Renderer::new(),
            picker: Picker::new(),
            adjacency,
            viewer_selection: Selection::new(),
            editor,
            events: EventQueue::new(),
            view_fb: Framebuffer::new(left_w, height),
            uv_fb: Framebuffer::new(right_w, height),
            surface: HalfBlockSurface::new(),
            export_path: PathBuf::from("uvedit-export.obj"),
            running: true,
            dirty: true,
            drag: None,
        })
    }

    pub fn set_wireframe(&mut self, wireframe: bool) {
        self.renderer.mode = if wireframe {
            RenderMode::Wireframe
        } else {
            RenderMode::Textured
        };
    }

    pub fn set_export_path(&mut self, path: PathBuf) {
        self.export_path = path;
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture
        )?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let mut next_tick = Instant::now();

        while self.running {
            let now = Instant::now();
            if now >= next_tick {
                if self.dirty {
                    self.render()?;
                    self.dirty = false;
                }
                next_tick = now + TICK;
            }

            let timeout = next_tick.saturating_duration_since(Instant::now());
            if event::poll(timeout)? {
                let ev = event::read()?;
                self.handle_event(ev);
                self.drain_events();
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, ev: Event) {
        match ev {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(cols, rows) => self.handle_resize(cols, rows),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                self.running = false;
            }
            KeyCode::Esc => {
                if self.editor.selection.is_empty() && self.viewer_selection.is_empty() {
                    self.running = false;
                } else {
                    self.editor.selection.clear();
                    self.editor.end_drag();
                    self.viewer_selection.clear();
                    self.dirty = true;
                }
            }
            KeyCode::Char('g') => {
                self.editor.set_mode(TransformMode::Move);
                self.dirty = true;
            }
            KeyCode::Char('s') => {
                self.editor.set_mode(TransformMode::Scale);
                self.dirty = true;
            }
            KeyCode::Char('r') => {
                self.editor.set_mode(TransformMode::Rotate);
                self.dirty = true;
            }
            KeyCode::Char('a') => {
                self.editor.select_all(&self.mesh);
                self.dirty = true;
            }
            KeyCode::Char('w') => {
                self.renderer.mode = match self.renderer.mode {
                    RenderMode::Textured => RenderMode::Wireframe,
                    RenderMode::Wireframe => RenderMode::Textured,
                };
                self.dirty = true;
            }
            KeyCode::Char('p') => {
                self.editor.pack_selection(&mut self.mesh, &mut self.events);
            }
            KeyCode::Char('u') => {
                self.editor.pack_islands(&mut self.mesh, &mut self.events);
            }
            KeyCode::Char('q') => {
                self.editor.rotate_quarter(&mut self.mesh, &mut self.events);
            }
            KeyCode::Char('e') => {
                self.editor.rotate_half(&mut self.mesh, &mut self.events);
            }
            KeyCode::Char('x') => {
                self.editor.flip_horizontal(&mut self.mesh, &mut self.events);
            }
            KeyCode::Char('y') => {
                self.editor.flip_vertical(&mut self.mesh, &mut self.events);
            }
            KeyCode::Char('t') => {
                self.editor.snap_to_grid(&mut self.mesh, &mut self.events);
            }
            KeyCode::Char('o') => {
                match obj::save_obj(&self.mesh, &self.export_path) {
                    Ok(()) => info!("exported mesh to {}", self.export_path.display()),
                    Err(e) => warn!("export failed: {e}"),
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let pane = self.locate(mouse.column, mouse.row);
        let shift = mouse.modifiers.contains(KeyModifiers::SHIFT);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => match pane {
                Pane::View3d { x, y } => {
                    self.drag = Some(Drag::Orbit { last: (x, y) });
                }
                Pane::UvEditor { x, y } => self.uv_press(x, y, shift),
                Pane::Divider => {}
            },
            MouseEventKind::Down(MouseButton::Right) => {
                if let Pane::View3d { x, y } = pane {
                    self.pick_at(x, y, shift);
                }
            }
            MouseEventKind::Down(MouseButton::Middle) => {
                if let Pane::UvEditor { x, y } = pane {
                    self.drag = Some(Drag::UvPan { last: (x, y) });
                }
            }
            MouseEventKind::Drag(_) => self.pointer_moved(pane),
            MouseEventKind::Up(_) => self.pointer_released(),
            MouseEventKind::ScrollUp => self.scroll(pane, true),
            MouseEventKind::ScrollDown => self.scroll(pane, false),
            _ => {}
        }
    }

    /// Left press in the UV pane: toggle with shift, otherwise select the
    /// vertex under the cursor and start a transform drag, or start a box
    /// selection over empty space.
    fn uv_press(&mut self, x: f32, y: f32, shift: bool) {
        let hit = self
            .editor
            .viewport
            .hit_test_vertex(&self.mesh, x, y, VERTEX_PICK_RADIUS);

        if shift {
            if let Some(hit) = hit {
                self.editor.selection.toggle(hit);
                self.dirty = true;
            }
            return;
        }

        match hit {
            Some(hit) => {
                if !self.editor.selection.contains(hit) {
                    self.editor
                        .selection
                        .apply([hit], false, self.mesh.vertices.len());
                }
                self.editor.begin_drag(&self.mesh);
                self.drag = Some(Drag::UvTransform { start: (x, y) });
                self.dirty = true;
            }
            None => {
                self.drag = Some(Drag::UvBox {
                    start: (x, y),
                    current: (x, y),
                });
            }
        }
    }

    /// Right press in the 3D pane: resolve the triangle under the pixel,
    /// expand it into its connected patch and broadcast the selection.
    fn pick_at(&mut self, x: i32, y: i32, additive: bool) {
        let width = self.view_fb.width() as u32;
        let height = self.view_fb.height() as u32;
        if let Some(seed) = self
            .picker
            .pick(&self.mesh, &self.camera, width, height, (x, y))
        {
            let expanded = expand_selection(self.adjacency.as_ref(), seed);
            self.events.push(EditorEvent::SelectionChanged {
                indices: expanded.into_iter().collect(),
                additive,
            });
        }
    }

    fn pointer_moved(&mut self, pane: Pane) {
        let drag = match &mut self.drag {
            Some(drag) => drag,
            None => return,
        };
        match drag {
            Drag::Orbit { last } => {
                if let Pane::View3d { x, y } = pane {
                    let (dx, dy) = (x - last.0, y - last.1);
                    *last = (x, y);
                    self.camera
                        .orbit(dx as f32 * ORBIT_PER_PIXEL, -(dy as f32) * ORBIT_PER_PIXEL);
                    self.dirty = true;
                }
            }
            Drag::UvTransform { start } => {
                if let Some((x, y)) = uv_point(pane) {
                    let (dx, dy) = (x - start.0, y - start.1);
                    self.editor
                        .update_drag(&mut self.mesh, dx, dy, &mut self.events);
                }
            }
            Drag::UvPan { last } => {
                if let Some((x, y)) = uv_point(pane) {
                    let (dx, dy) = (x - last.0, y - last.1);
                    *last = (x, y);
                    self.editor.viewport.pan(dx, dy);
                    self.dirty = true;
                }
            }
            Drag::UvBox { current, .. } => {
                if let Some((x, y)) = uv_point(pane) {
                    *current = (x, y);
                }
            }
        }
    }

    fn pointer_released(&mut self) {
        match self.drag.take() {
            Some(Drag::UvTransform { .. }) => {
                self.editor.end_drag();
            }
            Some(Drag::UvBox { start, current }) => {
                let hits = self.editor.viewport.vertices_in_rect(
                    &self.mesh,
                    start.0,
                    start.1,
                    current.0,
                    current.1,
                );
                self.editor
                    .selection
                    .apply(hits, false, self.mesh.vertices.len());
                self.dirty = true;
            }
            _ => {}
        }
    }

    fn scroll(&mut self, pane: Pane, up: bool) {
        match pane {
            Pane::View3d { .. } => {
                self.camera.zoom(if up { 0.9 } else { 1.1 });
                self.dirty = true;
            }
            Pane::UvEditor { x, y } => {
                self.editor
                    .viewport
                    .zoom_about(x, y, if up { 1.1 } else { 0.9 });
                self.dirty = true;
            }
            Pane::Divider => {}
        }
    }

    fn handle_resize(&mut self, cols: u16, rows: u16) {
        let (left_w, right_w, height) = pane_layout(cols, rows);
        self.view_fb.resize(left_w, height);
        self.uv_fb.resize(right_w, height);
        self.editor
            .viewport
            .set_size(right_w as u32, height as u32);
        self.dirty = true;
    }

    /// Reconcile both views from the queued change notifications.
    fn drain_events(&mut self) {
        while let Some(event) = self.events.pop() {
            match event {
                EditorEvent::SelectionChanged { indices, additive } => {
                    let count = self.mesh.vertices.len();
                    self.viewer_selection
                        .apply(indices.iter().copied(), additive, count);
                    self.editor.selection.apply(indices, additive, count);
                    self.dirty = true;
                }
                EditorEvent::UvChanged => {
                    self.dirty = true;
                }
            }
        }
    }

    /// Map a terminal cell to a pane-relative pixel position. Each cell is
    /// one pixel wide and two pixels tall.
    fn locate(&self, column: u16, row: u16) -> Pane {
        let left_w = self.view_fb.width();
        let col = column as usize;
        let py = row as i32 * 2;
        if col < left_w {
            Pane::View3d {
                x: col as i32,
                y: py,
            }
        } else if col == left_w {
            Pane::Divider
        } else {
            Pane::UvEditor {
                x: (col - left_w - 1) as f32,
                y: py as f32,
            }
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.render(
            &self.mesh,
            &self.texture,
            &self.camera,
            &self.viewer_selection,
            &mut self.view_fb,
        );
        render_uv_view(
            &self.mesh,
            &self.texture,
            &self.editor.selection,
            &self.editor.viewport,
            &mut self.uv_fb,
        );

        let mut stdout = stdout();
        self.surface.present(&mut stdout, &self.view_fb, &self.uv_fb)?;

        let status = format!(
            " {:?} | {:?} | {} selected ",
            self.editor.mode,
            self.renderer.mode,
            self.editor.selection.len()
        );
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(status),
            ResetColor
        )?;
        stdout.flush()
    }
}

/// Split the terminal into a 3D pane, a one-column divider and a UV pane,
/// in pixel units (one cell is 1x2 pixels).
fn pane_layout(cols: u16, rows: u16) -> (usize, usize, usize) {
    let cols = cols.max(3) as usize;
    let left = (cols - 1) / 2;
    let right = cols - 1 - left;
    let height = rows.max(1) as usize * 2;
    (left, right, height)
}

fn build_adjacency(mesh: &Mesh) -> Option<AdjacencyGraph> {
    if mesh.indices.len() >= 3 {
        Some(AdjacencyGraph::build(mesh))
    } else {
        None
    }
}

fn uv_point(pane: Pane) -> Option<(f32, f32)> {
    match pane {
        Pane::UvEditor { x, y } => Some((x, y)),
        _ => None,
    }
}
