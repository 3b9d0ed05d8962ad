//! Prompt composition for the Gift Guru model call.

use crate::models::GiftRequest;

/// Fixed instructions sent ahead of every user request.
pub const GIFT_GURU_INSTRUCTIONS: &str = "\
You are a gift-giving expert called \"The Gift Guru\".
Based on the user's needs (recipient, budget, interests and taboos), recommend 3 gift ideas.

[STRICT RULES]
1. Respond with a plain JSON array only.
2. Never use Markdown formatting (do not wrap the answer in ```json fences).
3. Every item must contain exactly these fields: name, price, reason, shoppingTips.";

const USER_NEEDS_HEADER: &str = "User needs:";

/// Combine the fixed instructions with the user's message.
pub fn compose_prompt(user_message: &str) -> String {
    format!(
        "{}\n\n{}\n{}",
        GIFT_GURU_INSTRUCTIONS, USER_NEEDS_HEADER, user_message
    )
}

/// Compose the prompt straight from a gift form.
pub fn compose_gift_prompt(request: &GiftRequest) -> String {
    compose_prompt(&request.to_message())
}
