use livechat_core::ChatMessage;

/// `[HH:MM:SS] author: text`, with the amount after the author for paid messages.
pub fn format_line(message: &ChatMessage) -> String {
    let time = message.timestamp.format("%H:%M:%S");
    match &message.purchase_amount {
        Some(amount) => format!("[{time}] {} ({amount}): {}", message.author, message.text),
        None => format!("[{time}] {}: {}", message.author, message.text),
    }
}

pub fn format_json(message: &ChatMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
