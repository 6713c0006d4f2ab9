//! @mention extraction from comment and note content.
//!
//! This module extracts user handles from markdown content while avoiding
//! false positives from code spans and email addresses, then fans a new
//! comment out into mention/comment notifications for session members.

use std::collections::HashSet;

use regex::Regex;

use scribe_core::{
    CollaborativeUser, NoteComment, Notification, NotificationPriority, NotificationType,
    RelatedType,
};

/// Extract mentioned handles from content.
///
/// Returns lowercase, deduplicated handles, sorted for consistent output.
///
/// # Rules
///
/// 1. Mentions are `@` followed by a letter, then letters, numbers,
///    underscores, hyphens
/// 2. Code blocks and inline code are excluded
/// 3. Email addresses are excluded (`alice@example.com` mentions no one)
/// 4. Handles are normalized to lowercase and deduplicated
pub fn extract_mentions(content: &str) -> Vec<String> {
    let without_code_blocks = remove_code_blocks(content);
    let without_inline_code = remove_inline_code(&without_code_blocks);

    // A word character before the @ makes it an email local part, not a
    // mention
    let mention_pattern = Regex::new(r"(?:^|[^a-zA-Z0-9_.-])@([a-zA-Z][a-zA-Z0-9_-]*)").unwrap();

    let mut handles = HashSet::new();
    for cap in mention_pattern.captures_iter(&without_inline_code) {
        if let Some(handle) = cap.get(1) {
            handles.insert(handle.as_str().to_lowercase());
        }
    }

    let mut result: Vec<String> = handles.into_iter().collect();
    result.sort();
    result
}

/// Remove fenced code blocks from content.
fn remove_code_blocks(content: &str) -> String {
    let code_block_pattern = Regex::new(r"(?s)```[a-z]*\n.*?```").unwrap();
    code_block_pattern.replace_all(content, "").to_string()
}

/// Remove inline code (backtick-wrapped) from content.
fn remove_inline_code(content: &str) -> String {
    let inline_code_pattern = Regex::new(r"`[^`]+`").unwrap();
    inline_code_pattern.replace_all(content, "").to_string()
}

/// Build the notifications a new comment produces for session members.
///
/// Mentioned members (matched case-insensitively on name) get a
/// `NOTE_MENTION` at high priority; every other member except the comment
/// author gets a `NOTE_COMMENT` at medium priority. A member both
/// mentioned and present gets only the mention.
pub fn comment_notifications(
    comment: &NoteComment,
    members: &[CollaborativeUser],
) -> Vec<Notification> {
    let mentioned = extract_mentions(&comment.content);
    let mut notifications = Vec::new();

    for member in members {
        if member.user_id == comment.author_id {
            continue;
        }

        let is_mentioned = mentioned.contains(&member.name.to_lowercase());
        let notification = if is_mentioned {
            Notification::new(
                member.user_id,
                NotificationType::NoteMention,
                format!("{} mentioned you", comment.author_name),
                comment.content.clone(),
                NotificationPriority::High,
            )
        } else {
            Notification::new(
                member.user_id,
                NotificationType::NoteComment,
                format!("{} commented", comment.author_name),
                comment.content.clone(),
                NotificationPriority::Medium,
            )
        };
        notifications
            .push(notification.with_related(comment.document_id.to_string(), RelatedType::Note));
    }
    notifications
}
