//! The 16-key input array.
//!
//! Other threads press and release keys through a [`KeySender`].
//! The simulator applies those events at the start of each step.

use crossbeam_channel::{Receiver, Sender};

/// The number of keys on the keypad.
pub const KEY_COUNT: usize = 16;

/// A change in a key's state.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum KeyEvent {
    /// The key was pressed.
    Press(u8),
    /// The key was released.
    Release(u8),
}

/// The input array.
///
/// Each of the 16 keys has a slot, which is nonzero while the key is pressed.
/// Note that the key test instructions (`JKP`, `JKNP`) consume a pressed key,
/// clearing its slot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Keypad([u8; KEY_COUNT]);

impl Keypad {
    /// Creates a keypad with no keys pressed.
    pub fn new() -> Self {
        Self([0; KEY_COUNT])
    }

    /// Presses a key.
    ///
    /// This returns false (and does nothing) if the key does not exist.
    pub fn press(&mut self, key: u8) -> bool {
        self.set_slot(key, 1)
    }

    /// Releases a key.
    ///
    /// This returns false (and does nothing) if the key does not exist.
    pub fn release(&mut self, key: u8) -> bool {
        self.set_slot(key, 0)
    }

    /// Checks whether a key is pressed. Keys that do not exist are never pressed.
    pub fn is_pressed(&self, key: u8) -> bool {
        self.0.get(usize::from(key))
            .is_some_and(|&slot| slot != 0)
    }

    /// Applies a key event.
    pub fn apply(&mut self, event: KeyEvent) -> bool {
        match event {
            KeyEvent::Press(k)   => self.press(k),
            KeyEvent::Release(k) => self.release(k),
        }
    }

    /// Releases every key.
    pub fn clear(&mut self) {
        self.0 = [0; KEY_COUNT];
    }

    /// Gets the slots of the input array.
    pub fn slots(&self) -> &[u8; KEY_COUNT] {
        &self.0
    }

    fn set_slot(&mut self, key: u8, value: u8) -> bool {
        match self.0.get_mut(usize::from(key)) {
            Some(slot) => {
                *slot = value;
                true
            },
            None => false
        }
    }
}

/// Handle used to send key events to a [`Simulator`] (possibly from another thread).
///
/// This can be created with [`Simulator::key_sender`].
/// Events are applied to the simulator's keypad at the start of its next step.
///
/// [`Simulator`]: crate::sim::Simulator
/// [`Simulator::key_sender`]: crate::sim::Simulator::key_sender
#[derive(Debug, Clone)]
pub struct KeySender(Sender<KeyEvent>);

impl KeySender {
    /// Sends a key event.
    ///
    /// This returns false if the simulator no longer exists.
    pub fn send(&self, event: KeyEvent) -> bool {
        self.0.send(event).is_ok()
    }

    /// Sends a key press.
    pub fn press(&self, key: u8) -> bool {
        self.send(KeyEvent::Press(key))
    }

    /// Sends a key release.
    pub fn release(&self, key: u8) -> bool {
        self.send(KeyEvent::Release(key))
    }
}

/// The simulator's end of the key event channel.
#[derive(Debug)]
pub(crate) struct KeyChannel {
    tx: Sender<KeyEvent>,
    rx: Receiver<KeyEvent>,
}

impl KeyChannel {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub(crate) fn sender(&self) -> KeySender {
        KeySender(self.tx.clone())
    }

    /// Applies every pending key event to the keypad.
    pub(crate) fn drain_into(&self, keypad: &mut Keypad) {
        for event in self.rx.try_iter() {
            if !keypad.apply(event) {
                tracing::debug!(?event, "ignored key event for nonexistent key");
            }
        }
    }
}

impl Default for KeyChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::{KeyChannel, KeyEvent, Keypad};

    #[test]
    fn test_keypad() {
        let mut keypad = Keypad::new();
        assert!(keypad.press(0xA));
        assert!(keypad.is_pressed(0xA));
        assert!(!keypad.is_pressed(0xB));

        assert!(!keypad.press(16));
        assert!(!keypad.is_pressed(16));

        assert!(keypad.apply(KeyEvent::Release(0xA)));
        assert!(!keypad.is_pressed(0xA));

        keypad.press(1);
        keypad.clear();
        assert_eq!(keypad.slots(), &[0; 16]);
    }

    #[test]
    fn test_channel_across_threads() {
        let channel = KeyChannel::new();
        let sender = channel.sender();

        thread::spawn(move || {
            sender.press(3);
            sender.press(7);
            sender.release(3);
            sender.press(200);
        }).join().unwrap();

        let mut keypad = Keypad::new();
        channel.drain_into(&mut keypad);
        assert!(!keypad.is_pressed(3));
        assert!(keypad.is_pressed(7));
    }
}
