//! Host-originated events delivered to the run loop.

use serde::{Deserialize, Serialize};

/// Pixel dimensions of the render surface.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
	/// Width in pixels.
	pub width: u32,
	/// Height in pixels.
	pub height: u32,
}

impl Size {
	/// Creates a size from width and height.
	pub const fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}
}

/// An event produced by the hosting surface.
///
/// `E` is the engine's native event type. Pointer input and resizes are split out
/// because the host handles them itself instead of feeding them to the step cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent<E> {
	/// A native event for the engine's step cycle.
	Engine(E),
	/// Pointer input, forwarded as a one-way command.
	Pointer(PointerEvent),
	/// The available area changed.
	Resize(Size),
}

/// Phase of a pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerEventKind {
	/// `pointerdown`
	#[serde(rename = "pointerdown")]
	Down,
	/// `pointermove`
	#[serde(rename = "pointermove")]
	Move,
	/// `pointerup`
	#[serde(rename = "pointerup")]
	Up,
	/// `pointercancel`
	#[serde(rename = "pointercancel")]
	Cancel,
	/// `pointerout`
	#[serde(rename = "pointerout")]
	Out,
	/// `pointerover`
	#[serde(rename = "pointerover")]
	Over,
}

/// Device class that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerType {
	/// Mouse or trackpad.
	Mouse,
	/// Stylus.
	Pen,
	/// Touch contact.
	Touch,
}

/// Pointer input in the engine's JSON shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
	/// Interaction phase.
	pub event_type: PointerEventKind,
	/// Surface-relative x, rounded to whole pixels.
	pub x: i32,
	/// Surface-relative y, rounded to whole pixels.
	pub y: i32,
	/// Identifier distinguishing concurrent pointers.
	pub pointer_id: i32,
	/// Device class.
	pub pointer_type: PointerType,
	/// Whether this is the primary pointer of its type.
	pub is_primary: bool,
}

impl PointerEvent {
	/// Builds a pointer event from fractional surface offsets.
	///
	/// Halves round toward positive infinity so `-0.5` becomes `0` and `0.5` becomes `1`.
	pub fn new(event_type: PointerEventKind, offset_x: f64, offset_y: f64, pointer_id: i32, pointer_type: PointerType, is_primary: bool) -> Self {
		Self {
			event_type,
			x: round_half_up(offset_x),
			y: round_half_up(offset_y),
			pointer_id,
			pointer_type,
			is_primary,
		}
	}
}

fn round_half_up(v: f64) -> i32 {
	(v + 0.5).floor() as i32
}
