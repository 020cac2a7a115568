//! Plain-text renderer for the terminal.

use std::io::Write;

use greencart_storefront::views::{
    CartCount, CartView, Notice, NoticeLevel, ProductCard, Renderer, Route, Star,
};

/// Writes view-models as text lines.
///
/// Write errors (a closed pipe, say) are ignored; there is nowhere left to
/// report them.
#[derive(Debug)]
pub struct TerminalRenderer<W> {
    out: W,
    last_count: Option<u64>,
}

impl<W: Write> TerminalRenderer<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out,
            last_count: None,
        }
    }

    /// Print a free-form line.
    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn stars(stars: &[Star; 5]) -> String {
    stars
        .iter()
        .map(|star| match star {
            Star::Full => '★',
            Star::Half => '½',
            Star::Empty => '☆',
        })
        .collect()
}

fn card_line(card: &ProductCard) -> String {
    let mut line = format!("#{:<5} {}  {}", card.id, card.name, card.price);
    if let (Some(original), Some(badge)) = (&card.original_price, card.discount_badge()) {
        line.push_str(&format!(" (was {original}, {badge})"));
    }
    line.push_str(&format!(
        "  {} ({} reviews)",
        stars(&card.stars),
        card.review_count
    ));
    if !card.category.is_empty() {
        line.push_str(&format!("  [{}]", card.category));
    }
    line
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    /// Only changes are printed; the first count is the starting value.
    fn render_cart_count(&mut self, count: &CartCount) {
        let previous = self.last_count.replace(count.count);
        if previous.is_some_and(|previous| previous != count.count) {
            let noun = if count.count == 1 { "item" } else { "items" };
            let _ = writeln!(self.out, "Cart: {} {noun}", count.count);
        }
    }

    fn render_cart(&mut self, cart: &CartView) {
        if cart.is_empty() {
            let _ = writeln!(self.out, "Your cart is empty");
            return;
        }

        for item in &cart.items {
            let variant = item
                .variant
                .as_deref()
                .map(|size| format!(" [{size}]"))
                .unwrap_or_default();
            let _ = writeln!(
                self.out,
                "#{:<5} {}{variant}  {} x {} = {}",
                item.product_id, item.name, item.quantity, item.price, item.line_price
            );
        }
        let _ = writeln!(
            self.out,
            "Subtotal: {} ({} items)",
            cart.subtotal, cart.item_count
        );
    }

    fn render_products(&mut self, products: &[ProductCard]) {
        if products.is_empty() {
            let _ = writeln!(self.out, "No products found");
            return;
        }
        for card in products {
            let _ = writeln!(self.out, "{}", card_line(card));
        }
    }

    fn notify(&mut self, notice: &Notice) {
        let prefix = match notice.level {
            NoticeLevel::Success => "✓",
            NoticeLevel::Info => "•",
            NoticeLevel::Error => "error:",
        };
        let _ = writeln!(self.out, "{prefix} {}", notice.message);
    }

    fn redirect(&mut self, route: Route) {
        if route == Route::Login {
            let _ = writeln!(self.out, "Sign in with: greencart login --email <email>");
        }
    }
}
