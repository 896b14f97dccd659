//! Core segmentation pipeline.
//!
//! Control flow: transport pushes frames into the [`frame_buffer`], the
//! [`segmenter`] poll loop drains them and drives per-speaker
//! [`utterance`] state machines, spawning one [`partial`] task per active
//! utterance and a detached [`finalizer`] task at each utterance end.

pub mod engine;
pub mod events;
pub mod filtering;
pub mod finalizer;
pub mod frame_buffer;
pub mod partial;
pub mod recognizer;
pub mod segmenter;
pub mod utterance;

#[cfg(test)]
pub(crate) mod testing;
