//! Tilt and keyboard input at the simulation boundary
//!
//! Hardware samples arrive on another thread; the game loop drains whatever
//! is queued once per frame and keeps only the newest reading.

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

use glam::DVec2;
use thiserror::Error;

use crate::settings::Settings;

/// Keyboard push per axis, in g
pub const KEYBOARD_ACCEL: f64 = 0.5;

/// Arrow keys currently held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl KeyState {
    pub fn any(&self) -> bool {
        self.left || self.right || self.up || self.down
    }

    /// Acceleration from held keys. Diagonals are scaled so they are no
    /// stronger than a single key per axis.
    pub fn accel(&self) -> DVec2 {
        let mut accel = DVec2::ZERO;
        if self.left {
            accel.x -= KEYBOARD_ACCEL;
        }
        if self.right {
            accel.x += KEYBOARD_ACCEL;
        }
        if self.up {
            accel.y -= KEYBOARD_ACCEL;
        }
        if self.down {
            accel.y += KEYBOARD_ACCEL;
        }
        if accel.x != 0.0 && accel.y != 0.0 {
            accel *= std::f64::consts::FRAC_1_SQRT_2;
        }
        accel
    }
}

/// Map a raw sensor reading into screen axes: swap first, then invert
pub fn orient(raw: DVec2, settings: &Settings) -> DVec2 {
    let mut v = if settings.swap_xy {
        DVec2::new(raw.y, raw.x)
    } else {
        raw
    };
    if settings.invert_x {
        v.x = -v.x;
    }
    if settings.invert_y {
        v.y = -v.y;
    }
    v
}

/// Tilt plus keyboard, the value handed to the tick
#[inline]
pub fn combine(tilt: DVec2, keys: &KeyState) -> DVec2 {
    tilt + keys.accel()
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("sample line does not start with 'X:': {0:?}")]
    NotASample(String),
    #[error("bad value for axis {axis}: {value:?}")]
    BadValue { axis: char, value: String },
}

/// One accelerometer reading in g
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TiltSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TiltSample {
    /// The x/y plane, which is all the ball cares about
    pub fn planar(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }
}

/// Parse a sensor line such as `X:0.12g,Y:-0.40g,Z:0.98g`.
///
/// Missing axes read as zero; unknown fields are skipped.
pub fn parse_sample(line: &str) -> Result<TiltSample, InputError> {
    let line = line.trim().replace('g', "");
    if !line.starts_with("X:") {
        return Err(InputError::NotASample(line));
    }

    let mut sample = TiltSample::default();
    for part in line.split(',') {
        let Some((axis, value)) = part.split_once(':') else {
            continue;
        };
        let slot = match axis.trim() {
            "X" => &mut sample.x,
            "Y" => &mut sample.y,
            "Z" => &mut sample.z,
            _ => continue,
        };
        *slot = value.trim().parse().map_err(|_| InputError::BadValue {
            axis: axis.trim().chars().next().unwrap_or('?'),
            value: value.to_string(),
        })?;
    }
    Ok(sample)
}

/// Receiving end of a tilt sensor thread
#[derive(Debug)]
pub struct TiltFeed {
    rx: Receiver<DVec2>,
    /// Newest sample seen so far; held between sensor updates
    last: DVec2,
    connected: bool,
}

impl TiltFeed {
    /// Create a feed and the sender a sensor thread pushes samples into
    pub fn channel() -> (Sender<DVec2>, Self) {
        let (tx, rx) = channel();
        (
            tx,
            Self {
                rx,
                last: DVec2::ZERO,
                connected: true,
            },
        )
    }

    /// Drain everything queued and return the newest sample.
    ///
    /// A sensor slower than the frame rate keeps its last reading. Zero
    /// before the first sample and once the sender has gone away.
    pub fn latest(&mut self) -> DVec2 {
        let mut fresh = None;
        loop {
            match self.rx.try_recv() {
                Ok(sample) => fresh = Some(sample),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.connected {
                        log::warn!("Tilt sensor disconnected, keyboard only");
                        self.connected = false;
                    }
                    self.last = DVec2::ZERO;
                    return fresh.unwrap_or(DVec2::ZERO);
                }
            }
        }
        if let Some(sample) = fresh {
            self.last = sample;
        }
        self.last
    }

    /// False once the sending side has gone away
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_keyboard_single_axis() {
        let keys = KeyState {
            right: true,
            ..Default::default()
        };
        assert_eq!(keys.accel(), DVec2::new(0.5, 0.0));

        let keys = KeyState {
            up: true,
            ..Default::default()
        };
        assert_eq!(keys.accel(), DVec2::new(0.0, -0.5));
        assert_eq!(KeyState::default().accel(), DVec2::ZERO);
    }

    #[test]
    fn test_keyboard_diagonal_normalised() {
        let keys = KeyState {
            left: true,
            down: true,
            ..Default::default()
        };
        let accel = keys.accel();
        assert_relative_eq!(accel.x, -0.5 / 2f64.sqrt());
        assert_relative_eq!(accel.y, 0.5 / 2f64.sqrt());
        assert_relative_eq!(accel.length(), 0.5);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let keys = KeyState {
            left: true,
            right: true,
            down: true,
            ..Default::default()
        };
        // Only one axis is non-zero, so no diagonal scaling
        assert_eq!(keys.accel(), DVec2::new(0.0, 0.5));
        assert!(keys.any());
    }

    #[test]
    fn test_orient_swaps_before_inverting() {
        let mut settings = Settings {
            invert_x: false,
            invert_y: false,
            ..Default::default()
        };
        let raw = DVec2::new(0.2, -0.7);
        assert_eq!(orient(raw, &settings), raw);

        settings.invert_x = true;
        assert_eq!(orient(raw, &settings), DVec2::new(-0.2, -0.7));

        settings.swap_xy = true;
        assert_eq!(orient(raw, &settings), DVec2::new(0.7, 0.2));

        // Defaults invert both axes
        assert_eq!(orient(raw, &Settings::default()), DVec2::new(-0.2, 0.7));
    }

    #[test]
    fn test_combine() {
        let keys = KeyState {
            right: true,
            ..Default::default()
        };
        assert_eq!(combine(DVec2::new(0.1, 0.3), &keys), DVec2::new(0.6, 0.3));
    }

    #[test]
    fn test_parse_sample() {
        let sample = parse_sample("X:1.23g,Y:-0.45g,Z:0.98g\r\n").unwrap();
        assert_eq!(sample, TiltSample { x: 1.23, y: -0.45, z: 0.98 });
        assert_eq!(sample.planar(), DVec2::new(1.23, -0.45));

        let sample = parse_sample("X:0.5,Y:0.25").unwrap();
        assert_eq!(sample.z, 0.0);
    }

    #[test]
    fn test_parse_sample_rejects_noise() {
        assert!(matches!(parse_sample("booting..."), Err(InputError::NotASample(_))));
        assert_eq!(
            parse_sample("X:abc,Y:0.1"),
            Err(InputError::BadValue {
                axis: 'X',
                value: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_feed_keeps_latest() {
        let (tx, mut feed) = TiltFeed::channel();
        assert_eq!(feed.latest(), DVec2::ZERO);

        tx.send(DVec2::new(0.1, 0.0)).unwrap();
        tx.send(DVec2::new(0.2, 0.0)).unwrap();
        tx.send(DVec2::new(0.3, -0.1)).unwrap();
        assert_eq!(feed.latest(), DVec2::new(0.3, -0.1));

        // Nothing new this frame, the reading holds
        assert_eq!(feed.latest(), DVec2::new(0.3, -0.1));
        assert!(feed.is_connected());

        tx.send(DVec2::new(-0.2, 0.0)).unwrap();
        assert_eq!(feed.latest(), DVec2::new(-0.2, 0.0));

        drop(tx);
        assert_eq!(feed.latest(), DVec2::ZERO);
        assert!(!feed.is_connected());
    }

    #[test]
    fn test_slow_sensor_never_drops_to_zero() {
        let (tx, mut feed) = TiltFeed::channel();
        let steady = DVec2::new(0.4, 0.0);
        let mut zero_frames = 0;
        for frame in 0..60 {
            // Sensor updates at half the frame rate
            if frame % 2 == 0 {
                tx.send(steady).unwrap();
            }
            if feed.latest() == DVec2::ZERO {
                zero_frames += 1;
            }
        }
        assert_eq!(zero_frames, 0);
    }

    #[test]
    fn test_feed_from_sensor_thread() {
        let (tx, mut feed) = TiltFeed::channel();
        let handle = std::thread::spawn(move || {
            for i in 0..10 {
                tx.send(DVec2::new(f64::from(i) * 0.1, 0.0)).unwrap();
            }
        });
        handle.join().unwrap();

        assert_relative_eq!(feed.latest().x, 0.9);
        // Sender dropped with the thread
        assert_eq!(feed.latest(), DVec2::ZERO);
        assert!(!feed.is_connected());
    }
}
