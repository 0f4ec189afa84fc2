//! Text components for list, card and detail views

use crate::app::{CardView, DetailView, ListView, PageView, EMPTY_MESSAGE};
use std::fmt::Write;

/// Favorite marker shown in front of a name
pub fn render_star(favorite: bool) -> &'static str {
    if favorite {
        "★"
    } else {
        "☆"
    }
}

/// Type tags as `[fire] [flying]`
pub fn render_type_tags(types: &[String]) -> String {
    types
        .iter()
        .map(|t| format!("[{}]", t))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_card(card: &CardView) -> String {
    let mut line = format!(
        "{} {:>6}  {:<16}",
        render_star(card.favorite),
        card.dex_number,
        card.name
    );
    if card.loaded {
        let _ = write!(
            line,
            " HP {:>3}  ATK {:>3}  DEF {:>3}  {}",
            card.hp,
            card.attack,
            card.defense,
            render_type_tags(&card.types)
        );
    }
    line.trim_end().to_string()
}

pub fn render_pagination(page: &PageView) -> String {
    let prev = if page.has_prev { "< prev" } else { "      " };
    let next = if page.has_next { "next >" } else { "" };
    format!(
        "{}  Page {} of {}  {}",
        prev, page.page, page.page_count, next
    )
    .trim_end()
    .to_string()
}

pub fn render_list(view: &ListView) -> String {
    match view {
        ListView::Loading => "Loading...".to_string(),
        ListView::Failed { message, error } => {
            format!("{}\n  {}\nType `retry` to try again.", message, error)
        }
        ListView::Page(page) => render_page(page),
    }
}

fn render_page(page: &PageView) -> String {
    let mut out = String::new();
    if page.type_pending {
        out.push_str("(loading type filter...)\n");
    }
    if page.cards.is_empty() {
        out.push_str(EMPTY_MESSAGE);
        out.push('\n');
    } else {
        for card in &page.cards {
            out.push_str(&render_card(card));
            out.push('\n');
        }
    }
    let _ = write!(out, "{} matching\n{}", page.total, render_pagination(page));
    out
}

pub fn render_detail(detail: &DetailView) -> String {
    let mut out = format!(
        "{} {} #{:03}\n",
        render_star(detail.favorite),
        detail.name,
        detail.id
    );
    if let Some(url) = &detail.image_url {
        let _ = writeln!(out, "  image:  {}", url);
    }
    // decimetres and hectograms
    let _ = writeln!(
        out,
        "  height: {:.1} m   weight: {:.1} kg",
        detail.height as f32 / 10.0,
        detail.weight as f32 / 10.0
    );
    let _ = writeln!(out, "  types:  {}", render_type_tags(&detail.types));

    if !detail.stats.is_empty() {
        out.push_str("  stats:\n");
        for (name, value) in &detail.stats {
            let _ = writeln!(out, "    {:<16} {:>3}", name, value);
        }
    }
    if !detail.abilities.is_empty() {
        let abilities: Vec<String> = detail
            .abilities
            .iter()
            .map(|(name, hidden)| {
                if *hidden {
                    format!("{} (hidden)", name)
                } else {
                    name.clone()
                }
            })
            .collect();
        let _ = writeln!(out, "  abilities: {}", abilities.join(", "));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::LIST_ERROR_MESSAGE;

    fn card(name: &str, loaded: bool) -> CardView {
        CardView {
            name: name.into(),
            dex_number: "#025".into(),
            image_url: String::new(),
            href: format!("/pokemon/{}", name),
            types: if loaded { vec!["electric".into()] } else { Vec::new() },
            hp: 35,
            attack: 55,
            defense: 40,
            favorite: false,
            loaded,
        }
    }

    fn page(cards: Vec<CardView>, page: usize, page_count: usize) -> PageView {
        PageView {
            total: cards.len(),
            cards,
            page,
            page_count,
            has_prev: page > 1,
            has_next: page < page_count,
            type_pending: false,
        }
    }

    #[test]
    fn loaded_card_shows_stats_and_types() {
        let line = render_card(&card("pikachu", true));
        assert_eq!(
            line,
            "☆   #025  pikachu          HP  35  ATK  55  DEF  40  [electric]"
        );
    }

    #[test]
    fn placeholder_card_shows_name_and_number_only() {
        let line = render_card(&card("pikachu", false));
        assert_eq!(line, "☆   #025  pikachu");
    }

    #[test]
    fn pagination_marks_available_directions() {
        assert_eq!(
            render_pagination(&page(Vec::new(), 1, 3)),
            "        Page 1 of 3  next >"
        );
        assert_eq!(
            render_pagination(&page(Vec::new(), 3, 3)),
            "< prev  Page 3 of 3"
        );
    }

    #[test]
    fn empty_page_shows_message() {
        let out = render_list(&ListView::Page(page(Vec::new(), 1, 1)));
        assert!(out.starts_with(EMPTY_MESSAGE));
        assert!(out.contains("Page 1 of 1"));
    }

    #[test]
    fn failure_offers_retry() {
        let out = render_list(&ListView::Failed {
            message: LIST_ERROR_MESSAGE.into(),
            error: "network error: timed out".into(),
        });
        assert!(out.starts_with(LIST_ERROR_MESSAGE));
        assert!(out.contains("retry"));
    }

    #[test]
    fn detail_lists_hidden_abilities() {
        let detail = DetailView {
            name: "bulbasaur".into(),
            id: 1,
            image_url: None,
            height: 7,
            weight: 69,
            types: vec!["grass".into(), "poison".into()],
            stats: vec![("hp".into(), 45)],
            abilities: vec![("overgrow".into(), false), ("chlorophyll".into(), true)],
            favorite: true,
        };
        let out = render_detail(&detail);
        assert!(out.starts_with("★ bulbasaur #001"));
        assert!(out.contains("height: 0.7 m   weight: 6.9 kg"));
        assert!(out.contains("[grass] [poison]"));
        assert!(out.contains("abilities: overgrow, chlorophyll (hidden)"));
    }
}
