use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_CPU_FREQUENCY: u32 = 1000;
pub const IO_FREQUENCY: u32 = 60;

/// How host keys map onto the 16-key hex keypad.
#[derive(PartialEq, Eq, Clone, Copy, Debug, clap::ValueEnum)]
pub enum KeyLayout {
    /// `0`-`9` and `a`-`f` press the key with that label.
    Hex,
    /// The keypad's 4x4 grid laid over `1234/qwer/asdf/zxcv`.
    Qwerty,
}

lazy_static! {
    static ref HEX_KEYMAP: HashMap<char, u8> = "0123456789abcdef"
        .chars()
        .enumerate()
        .map(|(i, c)| (c, i as u8))
        .collect();

    static ref QWERTY_KEYMAP: HashMap<char, u8> = vec![
        ('x', 0x0),
        ('1', 0x1),
        ('2', 0x2),
        ('3', 0x3),
        ('q', 0x4),
        ('w', 0x5),
        ('e', 0x6),
        ('a', 0x7),
        ('s', 0x8),
        ('d', 0x9),
        ('z', 0xA),
        ('y', 0xA),
        ('c', 0xB),
        ('4', 0xC),
        ('r', 0xD),
        ('f', 0xE),
        ('v', 0xF),
    ]
    .into_iter()
    .collect();
}

impl KeyLayout {
    pub fn key_for(self, c: char) -> Option<u8> {
        let keymap = match self {
            KeyLayout::Hex => &*HEX_KEYMAP,
            KeyLayout::Qwerty => &*QWERTY_KEYMAP,
        };
        keymap.get(&c.to_ascii_lowercase()).copied()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Target opcode rate; `None` runs as fast as the host allows.
    pub cpu_frequency: Option<u32>,
    pub io_frequency: u32,
    pub seed: Option<u64>,
    pub layout: KeyLayout,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cpu_frequency: Some(DEFAULT_CPU_FREQUENCY),
            io_frequency: IO_FREQUENCY,
            seed: None,
            layout: KeyLayout::Qwerty,
        }
    }
}

impl Config {
    pub fn cpu_period(&self) -> Option<Duration> {
        self.cpu_frequency.map(|hz| Duration::from_secs(1) / hz.max(1))
    }

    pub fn io_period(&self) -> Duration {
        Duration::from_secs(1) / self.io_frequency.max(1)
    }

    /// The random source handed to the machine. Seeded configs replay the
    /// same sequence every run.
    pub fn rng(&self) -> Box<dyn RngCore + Send> {
        match self.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        }
    }

    pub fn speed_up(&mut self) {
        if let Some(hz) = self.cpu_frequency {
            let faster = (hz as u64 * 11 / 10) as u32;
            self.cpu_frequency = Some(faster.max(hz.saturating_add(1)));
        }
    }

    pub fn slow_down(&mut self) {
        if let Some(hz) = self.cpu_frequency {
            let slower = (hz as u64 * 10 / 11) as u32;
            self.cpu_frequency = Some(slower.max(1));
        }
    }

    pub fn reset_speed(&mut self) {
        self.cpu_frequency = Some(DEFAULT_CPU_FREQUENCY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_cover_every_key() {
        for layout in [KeyLayout::Hex, KeyLayout::Qwerty] {
            let mut seen = [false; 16];
            for c in "0123456789abcdefqwerasdfzxcvy".chars() {
                if let Some(key) = layout.key_for(c) {
                    seen[key as usize] = true;
                }
            }
            assert!(seen.iter().all(|s| *s), "{:?} misses a key", layout);
        }
    }

    #[test]
    fn test_qwerty_layout() {
        assert_eq!(KeyLayout::Qwerty.key_for('x'), Some(0x0));
        assert_eq!(KeyLayout::Qwerty.key_for('4'), Some(0xC));
        assert_eq!(KeyLayout::Qwerty.key_for('V'), Some(0xF));
        assert_eq!(KeyLayout::Qwerty.key_for('p'), None);
        assert_eq!(KeyLayout::Hex.key_for('B'), Some(0xB));
    }

    #[test]
    fn test_periods() {
        let config = Config::default();
        assert_eq!(config.cpu_period(), Some(Duration::from_millis(1)));
        assert_eq!(config.io_period(), Duration::from_nanos(16_666_666));
        let unthrottled = Config {
            cpu_frequency: None,
            ..Config::default()
        };
        assert_eq!(unthrottled.cpu_period(), None);
    }

    #[test]
    fn test_speed_adjustment() {
        let mut config = Config::default();
        config.speed_up();
        assert_eq!(config.cpu_frequency, Some(1100));
        config.slow_down();
        config.slow_down();
        assert_eq!(config.cpu_frequency, Some(909));
        config.reset_speed();
        assert_eq!(config.cpu_frequency, Some(1000));

        let mut slow = Config {
            cpu_frequency: Some(1),
            ..Config::default()
        };
        slow.slow_down();
        assert_eq!(slow.cpu_frequency, Some(1));
        slow.speed_up();
        assert_eq!(slow.cpu_frequency, Some(2));
    }

    #[test]
    fn test_seeded_rng_repeats() {
        let config = Config {
            seed: Some(7),
            ..Config::default()
        };
        assert_eq!(config.rng().next_u64(), config.rng().next_u64());
    }
}
