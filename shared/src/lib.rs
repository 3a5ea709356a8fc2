use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum nickname length, counted after surrounding whitespace is trimmed.
pub const MAX_NICKNAME_LEN: usize = 16;

/// Board coordinate as used by the clients (x = file, z = rank).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BoardPos {
    pub x: i32,
    pub z: i32,
}

/// Side assignment handed out when a match forms.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn other(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

/// Fields common to every turn action. The relay checks that the required
/// coordinates are present but attaches no meaning to them; any additional
/// fields are captured in `extra` and forwarded untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    pub unit_pos: BoardPos,
    pub target_pos: BoardPos,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_index: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Messages a client may send. One JSON object per WebSocket text frame,
/// discriminated by `type`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    SetNickname { nickname: String },
    Move(ActionBody),
    Attack(ActionBody),
    Skill(ActionBody),
}

/// Messages the server sends back.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Error {
        message: String,
    },
    WaitingForOpponent,
    #[serde(rename_all = "camelCase")]
    MatchFound {
        opponent_nickname: String,
        color: Color,
    },
    OpponentMove {
        action: ClientMessage,
    },
    OpponentDisconnected {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_nickname_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"setNickname","nickname":"Alice"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetNickname {
                nickname: "Alice".to_string()
            }
        );
    }

    #[test]
    fn test_move_wire_format() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"move","unitPos":{"x":0,"z":1},"targetPos":{"x":0,"z":2}}"#,
        )
        .unwrap();

        match msg {
            ClientMessage::Move(body) => {
                assert_eq!(body.unit_pos, BoardPos { x: 0, z: 1 });
                assert_eq!(body.target_pos, BoardPos { x: 0, z: 2 });
                assert_eq!(body.skill_index, None);
                assert!(body.extra.is_empty());
            }
            other => panic!("Expected move, got {:?}", other),
        }
    }

    #[test]
    fn test_skill_carries_index() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"skill","unitPos":{"x":3,"z":3},"targetPos":{"x":4,"z":5},"skillIndex":2}"#,
        )
        .unwrap();

        match msg {
            ClientMessage::Skill(body) => assert_eq!(body.skill_index, Some(2)),
            other => panic!("Expected skill, got {:?}", other),
        }
    }

    #[test]
    fn test_action_missing_target_is_rejected() {
        let result =
            serde_json::from_str::<ClientMessage>(r#"{"type":"attack","unitPos":{"x":1,"z":1}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"cancelMatchmaking"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_extra_action_fields_survive_roundtrip() {
        let raw = json!({
            "type": "attack",
            "unitPos": {"x": 2, "z": 4},
            "targetPos": {"x": 2, "z": 5},
            "animation": "slash",
            "damage": 7
        });

        let msg: ClientMessage = serde_json::from_value(raw.clone()).unwrap();
        let reencoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(reencoded, raw);
    }

    #[test]
    fn test_move_without_skill_index_reencodes_without_it() {
        let raw = json!({
            "type": "move",
            "unitPos": {"x": 0, "z": 1},
            "targetPos": {"x": 0, "z": 2}
        });

        let msg: ClientMessage = serde_json::from_value(raw.clone()).unwrap();
        let reencoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(reencoded, raw);
    }

    #[test]
    fn test_match_found_wire_format() {
        let msg = ServerMessage::MatchFound {
            opponent_nickname: "Bob".to_string(),
            color: Color::White,
        };

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type":"matchFound","opponentNickname":"Bob","color":"white"})
        );
    }

    #[test]
    fn test_waiting_for_opponent_wire_format() {
        let value = serde_json::to_value(&ServerMessage::WaitingForOpponent).unwrap();
        assert_eq!(value, json!({"type":"waitingForOpponent"}));
    }

    #[test]
    fn test_opponent_move_nests_original_action() {
        let action: ClientMessage = serde_json::from_str(
            r#"{"type":"move","unitPos":{"x":0,"z":1},"targetPos":{"x":0,"z":2}}"#,
        )
        .unwrap();

        let value = serde_json::to_value(&ServerMessage::OpponentMove { action }).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "opponentMove",
                "action": {
                    "type": "move",
                    "unitPos": {"x": 0, "z": 1},
                    "targetPos": {"x": 0, "z": 2}
                }
            })
        );
    }

    #[test]
    fn test_color_other_side() {
        assert_eq!(Color::White.other(), Color::Black);
        assert_eq!(Color::Black.other(), Color::White);
    }

    #[test]
    fn test_color_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Color::White).unwrap(), r#""white""#);
        assert_eq!(serde_json::to_string(&Color::Black).unwrap(), r#""black""#);
    }
}
