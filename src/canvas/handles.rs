//! Connection anchor selection

use super::node::Position;
use serde::{Deserialize, Serialize};

/// Side of a node an edge attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Top,
    Bottom,
    Left,
    Right,
}

/// Pick the (source, target) anchors for an edge between two positions
///
/// The dominant axis decides: horizontal gives right→left (left→right when the
/// target lies to the left), vertical gives bottom→top (top→bottom when the
/// target lies above). Equal distances count as horizontal.
pub fn best_handles(source: Position, target: Position) -> (Handle, Handle) {
    let dx = target.x - source.x;
    let dy = target.y - source.y;

    if dy.abs() > dx.abs() {
        if dy > 0.0 {
            (Handle::Bottom, Handle::Top)
        } else {
            (Handle::Top, Handle::Bottom)
        }
    } else if dx >= 0.0 {
        (Handle::Right, Handle::Left)
    } else {
        (Handle::Left, Handle::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn horizontal_dominant() {
        assert_eq!(best_handles(at(0.0, 0.0), at(300.0, 40.0)), (Handle::Right, Handle::Left));
        assert_eq!(best_handles(at(0.0, 0.0), at(-300.0, 40.0)), (Handle::Left, Handle::Right));
    }

    #[test]
    fn vertical_dominant() {
        assert_eq!(best_handles(at(0.0, 0.0), at(10.0, 200.0)), (Handle::Bottom, Handle::Top));
        assert_eq!(best_handles(at(0.0, 0.0), at(10.0, -200.0)), (Handle::Top, Handle::Bottom));
    }

    #[test]
    fn equal_distances_connect_horizontally() {
        assert_eq!(best_handles(at(0.0, 0.0), at(100.0, 100.0)), (Handle::Right, Handle::Left));
        assert_eq!(best_handles(at(0.0, 0.0), at(-100.0, -100.0)), (Handle::Left, Handle::Right));
    }

    #[test]
    fn coincident_positions_default_to_right_left() {
        assert_eq!(best_handles(at(5.0, 5.0), at(5.0, 5.0)), (Handle::Right, Handle::Left));
    }
}
