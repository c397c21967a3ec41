//! SDL2 Window Display Module
//! Creates an SDL2 window and renders RGB24 frames into a streaming texture.
//! Keyboard input doubles as the operator command channel.

use std::time::Instant;

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;

use tracing::info;

use crate::capture::{Frame, PixelFormat};
use crate::display::{status_text, Command, DisplaySink};
use crate::error::{DisplayError, PipelineError};

const WINDOW_TITLE: &str = "dualcam";

/// SDL2 Window Display
pub struct Sdl2Display {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    event_pump: EventPump,
    last_status: Option<bool>,
    // Keeps SDL initialized for the lifetime of the window
    _sdl_context: sdl2::Sdl,
}

impl Sdl2Display {
    pub fn new(width: u32, height: u32) -> Result<Self, PipelineError> {
        let acquire = |e: String| PipelineError::acquisition("display", e);

        let sdl_context = sdl2::init().map_err(acquire)?;
        let video_subsystem = sdl_context.video().map_err(acquire)?;

        let window = video_subsystem
            .window(WINDOW_TITLE, width, height)
            .position_centered()
            .build()
            .map_err(|e| acquire(e.to_string()))?;

        let canvas = window
            .into_canvas()
            .present_vsync()
            .build()
            .map_err(|e| acquire(e.to_string()))?;
        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump().map_err(acquire)?;

        info!("SDL2 display opened: {}x{}", width, height);
        Ok(Self {
            canvas,
            texture_creator,
            event_pump,
            last_status: None,
            _sdl_context: sdl_context,
        })
    }
}

impl DisplaySink for Sdl2Display {
    fn render(&mut self, frame: &Frame, saving: bool) -> Result<(), DisplayError> {
        let render_start = Instant::now();
        if frame.meta.format != PixelFormat::Rgb24 {
            return Err(DisplayError::Render(format!(
                "unsupported pixel format: {:?}",
                frame.meta.format
            )));
        }

        if self.last_status != Some(saving) {
            let title = format!("{} - {}", WINDOW_TITLE, status_text(saving));
            self.canvas
                .window_mut()
                .set_title(&title)
                .map_err(|e| DisplayError::Render(e.to_string()))?;
            self.last_status = Some(saving);
        }

        let (width, height) = frame.dimensions();
        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
            .map_err(|e| DisplayError::Render(e.to_string()))?;

        texture
            .update(None, &frame.data, frame.meta.stride as usize)
            .map_err(|e| DisplayError::Render(e.to_string()))?;

        self.canvas.clear();
        self.canvas
            .copy(&texture, None, None)
            .map_err(DisplayError::Render)?;

        self.canvas.present();
        metrics::histogram!("render_time_us").record(render_start.elapsed().as_micros() as f64);
        Ok(())
    }

    fn poll_command(&mut self) -> Command {
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => {
                    info!("Quit event received");
                    return Command::Quit;
                }
                Event::KeyDown {
                    keycode: Some(Keycode::S),
                    repeat: false,
                    ..
                } => return Command::ToggleSave,
                Event::KeyDown {
                    keycode: Some(Keycode::Q),
                    ..
                } => return Command::Quit,
                _ => {}
            }
        }
        Command::None
    }

    fn close(&mut self) {
        info!("SDL2 display closed");
    }
}
