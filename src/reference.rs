// Booking and payment reference generation.
// References look like HB123456789ABC: prefix, nine timestamp digits and a
// three character random suffix.

use crate::model::BookingReference;
use chrono::Utc;
use parking_lot::Mutex;
use rand::distributions::Uniform;
use rand::Rng;
use std::collections::VecDeque;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 3;
const TIMESTAMP_DIGITS: u64 = 1_000_000_000;

pub const PAYMENT_PREFIX: &str = "PAY";

pub trait ReferenceGenerator: Send + Sync + 'static {
    fn booking_reference(&self) -> BookingReference;

    fn payment_reference(&self) -> String;
}

// Prefix + last nine digits of the millisecond clock + random suffix
pub struct TimestampReferenceGenerator {
    prefix: String,
}

impl TimestampReferenceGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn generate(&self, prefix: &str) -> String {
        let millis = Utc::now().timestamp_millis().unsigned_abs() % TIMESTAMP_DIGITS;
        format!("{}{:09}{}", prefix, millis, random_suffix(&mut rand::thread_rng()))
    }
}

impl Default for TimestampReferenceGenerator {
    fn default() -> Self {
        Self::new("HB")
    }
}

impl ReferenceGenerator for TimestampReferenceGenerator {
    fn booking_reference(&self) -> BookingReference {
        BookingReference::new(self.generate(&self.prefix))
    }

    fn payment_reference(&self) -> String {
        self.generate(PAYMENT_PREFIX)
    }
}

pub fn random_suffix<R: Rng>(rng: &mut R) -> String {
    let range = Uniform::from(0..SUFFIX_ALPHABET.len());
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.sample(range)] as char)
        .collect()
}

// Hands out a fixed sequence of booking references, then falls back to
// generated ones. Used to reproduce reference collisions.
pub struct ScriptedReferenceGenerator {
    scripted: Mutex<VecDeque<BookingReference>>,
    fallback: TimestampReferenceGenerator,
}

impl ScriptedReferenceGenerator {
    pub fn new<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scripted: Mutex::new(
                references.into_iter().map(BookingReference::new).collect(),
            ),
            fallback: TimestampReferenceGenerator::default(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.scripted.lock().len()
    }
}

impl ReferenceGenerator for ScriptedReferenceGenerator {
    fn booking_reference(&self) -> BookingReference {
        match self.scripted.lock().pop_front() {
            Some(reference) => reference,
            None => self.fallback.booking_reference(),
        }
    }

    fn payment_reference(&self) -> String {
        self.fallback.payment_reference()
    }
}
