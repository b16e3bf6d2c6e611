//! Window and input handling
//!
//! The render loop only needs two things from a display: somewhere to push a
//! finished framebuffer and a non-blocking queue of user events.

use crate::waterfall::Framebuffer;
use anyhow::{Result, anyhow};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Quit,
    Snapshot,
}

pub trait Display {
    /// Drain pending events without blocking
    fn poll_events(&mut self) -> Vec<UiEvent>;

    fn present(&mut self, framebuffer: &Framebuffer) -> Result<()>;
}

/// minifb window sized to the framebuffer, one window pixel per buffer pixel
pub struct MinifbDisplay {
    window: Window,
}

impl MinifbDisplay {
    pub fn open(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| anyhow!("Failed to open window: {}", e))?;

        // Presenting must never throttle the serial reads
        window.set_target_fps(0);

        tracing::info!("[display] opened {}x{} window", width, height);
        Ok(Self { window })
    }
}

impl Display for MinifbDisplay {
    fn poll_events(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();

        if self.window.is_key_pressed(Key::S, KeyRepeat::No)
            || self.window.is_key_pressed(Key::P, KeyRepeat::No)
        {
            events.push(UiEvent::Snapshot);
        }

        if !self.window.is_open()
            || self.window.is_key_down(Key::Escape)
            || self.window.is_key_down(Key::Q)
        {
            events.push(UiEvent::Quit);
        }

        events
    }

    fn present(&mut self, framebuffer: &Framebuffer) -> Result<()> {
        self.window
            .update_with_buffer(
                framebuffer.pixels(),
                framebuffer.width(),
                framebuffer.height(),
            )
            .map_err(|e| anyhow!("Failed to present frame: {}", e))
    }
}
