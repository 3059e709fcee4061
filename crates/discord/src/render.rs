//! Template → serenity builder conversions.

use serenity::all::{
    ButtonStyle as DiscordButtonStyle, CreateActionRow, CreateButton, CreateEmbed,
    CreateEmbedFooter, CreateInputText, CreateInteractionResponseMessage, CreateModal,
    EditInteractionResponse, InputTextStyle, ReactionType, Timestamp,
};
use vireo_core::domain::campaign::ButtonStyle;

use crate::messages::{ButtonTemplate, EmbedTemplate, ModalTemplate, Reply, TextInputStyle};

pub fn button_style(style: ButtonStyle) -> DiscordButtonStyle {
    match style {
        ButtonStyle::Primary => DiscordButtonStyle::Primary,
        ButtonStyle::Secondary => DiscordButtonStyle::Secondary,
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    }
}

pub fn embed(template: &EmbedTemplate) -> CreateEmbed {
    let mut embed = CreateEmbed::new().color(template.color);
    if let Some(title) = &template.title {
        embed = embed.title(title);
    }
    if let Some(description) = &template.description {
        embed = embed.description(description);
    }
    for field in &template.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(text) = &template.footer {
        let mut footer = CreateEmbedFooter::new(text);
        if let Some(icon) = &template.footer_icon_url {
            footer = footer.icon_url(icon);
        }
        embed = embed.footer(footer);
    }
    if let Some(url) = &template.thumbnail_url {
        embed = embed.thumbnail(url);
    }
    if let Some(timestamp) =
        template.timestamp.and_then(|at| Timestamp::from_unix_timestamp(at.timestamp()).ok())
    {
        embed = embed.timestamp(timestamp);
    }
    embed
}

pub fn button(template: &ButtonTemplate) -> CreateButton {
    let button = CreateButton::new(&template.custom_id)
        .label(&template.label)
        .style(button_style(template.style));
    match &template.emoji {
        Some(emoji) => button.emoji(ReactionType::Unicode(emoji.clone())),
        None => button,
    }
}

pub fn button_row(buttons: &[ButtonTemplate]) -> Vec<CreateActionRow> {
    if buttons.is_empty() {
        return Vec::new();
    }
    vec![CreateActionRow::Buttons(buttons.iter().map(button).collect())]
}

pub fn modal(template: &ModalTemplate) -> CreateModal {
    let rows = template
        .inputs
        .iter()
        .map(|input| {
            let style = match input.style {
                TextInputStyle::Short => InputTextStyle::Short,
                TextInputStyle::Paragraph => InputTextStyle::Paragraph,
            };
            CreateActionRow::InputText(
                CreateInputText::new(style, &input.label, &input.custom_id)
                    .max_length(input.max_length)
                    .required(input.required),
            )
        })
        .collect();
    CreateModal::new(&template.custom_id, &template.title).components(rows)
}

pub fn response_message(reply: &Reply) -> CreateInteractionResponseMessage {
    let mut message = CreateInteractionResponseMessage::new().ephemeral(reply.ephemeral);
    if let Some(content) = &reply.content {
        message = message.content(content);
    }
    if !reply.embeds.is_empty() {
        message = message.embeds(reply.embeds.iter().map(embed).collect());
    }
    if !reply.buttons.is_empty() {
        message = message.components(button_row(&reply.buttons));
    }
    message
}

/// Deferred replies are already ephemeral; the edit only fills in the body.
pub fn edit_response(reply: &Reply) -> EditInteractionResponse {
    let mut edit = EditInteractionResponse::new();
    if let Some(content) = &reply.content {
        edit = edit.content(content);
    }
    if !reply.embeds.is_empty() {
        edit = edit.embeds(reply.embeds.iter().map(embed).collect());
    }
    if !reply.buttons.is_empty() {
        edit = edit.components(button_row(&reply.buttons));
    }
    edit
}

#[cfg(test)]
mod tests {
    use serenity::all::ButtonStyle as DiscordButtonStyle;
    use vireo_core::domain::campaign::ButtonStyle;

    use super::{button_row, button_style, embed};
    use crate::messages::{EmbedBuilder, Reply};

    #[test]
    fn styles_map_one_to_one() {
        assert_eq!(button_style(ButtonStyle::Primary), DiscordButtonStyle::Primary);
        assert_eq!(button_style(ButtonStyle::Secondary), DiscordButtonStyle::Secondary);
        assert_eq!(button_style(ButtonStyle::Success), DiscordButtonStyle::Success);
        assert_eq!(button_style(ButtonStyle::Danger), DiscordButtonStyle::Danger);
    }

    #[test]
    fn embed_serializes_fields_and_color() {
        let template = EmbedBuilder::new(0x21_96_F3)
            .title("📊 Campaign Join Log")
            .field("Campaign", "Summer Promo", true)
            .build();
        let json = serde_json::to_value(embed(&template)).expect("serialize embed");
        assert_eq!(json["title"], "📊 Campaign Join Log");
        assert_eq!(json["color"], 0x21_96_F3);
        assert_eq!(json["fields"][0]["inline"], true);
    }

    #[test]
    fn replies_without_buttons_have_no_rows() {
        assert!(button_row(&Reply::ephemeral("hi").buttons).is_empty());
    }
}
