//! Interaction event model and CSV row encoding.
//!
//! Six event kinds, one CSV file per kind per session. Rows are encoded
//! by hand; fields containing separators or quotes are quoted per RFC
//! 4180.

use chrono::{DateTime, Utc};

/// Kind of interaction event, one sink file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Comments,
    Gifts,
    Follows,
    Shares,
    Joins,
    Likes,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Comments,
        EventKind::Gifts,
        EventKind::Follows,
        EventKind::Shares,
        EventKind::Joins,
        EventKind::Likes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Comments => "comments",
            EventKind::Gifts => "gifts",
            EventKind::Follows => "follows",
            EventKind::Shares => "shares",
            EventKind::Joins => "joins",
            EventKind::Likes => "likes",
        }
    }

    pub fn csv_header(&self) -> &'static str {
        match self {
            EventKind::Comments => "timestamp,user_id,nickname,comment,follower_count",
            EventKind::Gifts => {
                "timestamp,user_id,nickname,gift_name,repeat_count,streakable,streaking"
            }
            EventKind::Follows => "timestamp,user_id,nickname,follow_count,share_type,action",
            EventKind::Shares => {
                "timestamp,user_id,nickname,share_type,share_target,share_count,users_joined,action"
            }
            EventKind::Joins => {
                "timestamp,user_id,nickname,count,is_top_user,enter_type,action,user_share_type,client_enter_source"
            }
            EventKind::Likes => "timestamp,user_id,nickname,count,total,color,effect_cnt",
        }
    }
}

/// One interaction observed during a live stream.
#[derive(Debug, Clone)]
pub enum InteractionEvent {
    Comment {
        timestamp: DateTime<Utc>,
        user_id: String,
        nickname: String,
        comment: String,
        follower_count: u64,
    },
    Gift {
        timestamp: DateTime<Utc>,
        user_id: String,
        nickname: String,
        gift_name: String,
        repeat_count: u32,
        streakable: bool,
        streaking: bool,
    },
    Follow {
        timestamp: DateTime<Utc>,
        user_id: String,
        nickname: String,
        follow_count: u64,
        share_type: u32,
        action: u32,
    },
    Share {
        timestamp: DateTime<Utc>,
        user_id: String,
        nickname: String,
        share_type: u32,
        share_target: String,
        share_count: u32,
        users_joined: u32,
        action: u32,
    },
    Join {
        timestamp: DateTime<Utc>,
        user_id: String,
        nickname: String,
        count: u32,
        is_top_user: bool,
        enter_type: u32,
        action: u32,
        user_share_type: String,
        client_enter_source: String,
    },
    Like {
        timestamp: DateTime<Utc>,
        user_id: String,
        nickname: String,
        count: u32,
        total: u64,
        color: u32,
        effect_cnt: u32,
    },
}

impl InteractionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InteractionEvent::Comment { .. } => EventKind::Comments,
            InteractionEvent::Gift { .. } => EventKind::Gifts,
            InteractionEvent::Follow { .. } => EventKind::Follows,
            InteractionEvent::Share { .. } => EventKind::Shares,
            InteractionEvent::Join { .. } => EventKind::Joins,
            InteractionEvent::Like { .. } => EventKind::Likes,
        }
    }

    /// Encode the event as one CSV row, newline excluded.
    pub fn csv_row(&self) -> String {
        let fields: Vec<String> = match self {
            InteractionEvent::Comment {
                timestamp,
                user_id,
                nickname,
                comment,
                follower_count,
            } => vec![
                timestamp.to_rfc3339(),
                user_id.clone(),
                nickname.clone(),
                comment.clone(),
                follower_count.to_string(),
            ],
            InteractionEvent::Gift {
                timestamp,
                user_id,
                nickname,
                gift_name,
                repeat_count,
                streakable,
                streaking,
            } => vec![
                timestamp.to_rfc3339(),
                user_id.clone(),
                nickname.clone(),
                gift_name.clone(),
                repeat_count.to_string(),
                streakable.to_string(),
                streaking.to_string(),
            ],
            InteractionEvent::Follow {
                timestamp,
                user_id,
                nickname,
                follow_count,
                share_type,
                action,
            } => vec![
                timestamp.to_rfc3339(),
                user_id.clone(),
                nickname.clone(),
                follow_count.to_string(),
                share_type.to_string(),
                action.to_string(),
            ],
            InteractionEvent::Share {
                timestamp,
                user_id,
                nickname,
                share_type,
                share_target,
                share_count,
                users_joined,
                action,
            } => vec![
                timestamp.to_rfc3339(),
                user_id.clone(),
                nickname.clone(),
                share_type.to_string(),
                share_target.clone(),
                share_count.to_string(),
                users_joined.to_string(),
                action.to_string(),
            ],
            InteractionEvent::Join {
                timestamp,
                user_id,
                nickname,
                count,
                is_top_user,
                enter_type,
                action,
                user_share_type,
                client_enter_source,
            } => vec![
                timestamp.to_rfc3339(),
                user_id.clone(),
                nickname.clone(),
                count.to_string(),
                is_top_user.to_string(),
                enter_type.to_string(),
                action.to_string(),
                user_share_type.clone(),
                client_enter_source.clone(),
            ],
            InteractionEvent::Like {
                timestamp,
                user_id,
                nickname,
                count,
                total,
                color,
                effect_cnt,
            } => vec![
                timestamp.to_rfc3339(),
                user_id.clone(),
                nickname.clone(),
                count.to_string(),
                total.to_string(),
                color.to_string(),
                effect_cnt.to_string(),
            ],
        };
        encode_csv_row(&fields)
    }
}

/// Join fields into a CSV row, quoting where needed.
pub fn encode_csv_row(fields: &[String]) -> String {
    let mut row = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            row.push(',');
        }
        row.push_str(&escape_csv_field(field));
    }
    row
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_column_count_matches_row_field_count() {
        let event = InteractionEvent::Join {
            timestamp: Utc::now(),
            user_id: "u1".into(),
            nickname: "amy".into(),
            count: 1,
            is_top_user: false,
            enter_type: 0,
            action: 0,
            user_share_type: String::new(),
            client_enter_source: String::new(),
        };
        let header_cols = event.kind().csv_header().split(',').count();
        let row_cols = event.csv_row().split(',').count();
        assert_eq!(header_cols, row_cols);
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        let event = InteractionEvent::Comment {
            timestamp: Utc::now(),
            user_id: "u1".into(),
            nickname: "a\"my".into(),
            comment: "hello, world".into(),
            follower_count: 7,
        };
        let row = event.csv_row();
        assert!(row.contains("\"hello, world\""));
        assert!(row.contains("\"a\"\"my\""));
    }

    #[test]
    fn every_kind_has_a_distinct_name() {
        let names: std::collections::HashSet<&str> =
            EventKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), EventKind::ALL.len());
    }
}
