//! Conversation state machine: one inbound message in, one reply out.
//!
//! `handle_turn` advances a session through the scripted flow (main menu,
//! customer data, product search, quantity entry, finalization, FAQ lookup,
//! advisor handoff). `process_message` is the turn driver that owns session
//! lifecycle and the fatal-error fallback.

use anyhow::Result;
use tracing::{error, info};

use crate::appsheet::{Backend, Product};
use crate::localization::{t, t_args};
use crate::matching;
use crate::orders::{self, format_money, Order};
use crate::session::{ConversationState, Session, SessionStore};
use crate::text_processing::normalize;

/// Channel-agnostic outbound reply. Channel adapters render it as TwiML or
/// as a Telegram send call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
}

impl Reply {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Result of one state-machine step.
#[derive(Debug)]
pub struct TurnOutcome {
    pub reply: Reply,
    /// Terminal turn: the session must be discarded.
    pub end_session: bool,
}

impl TurnOutcome {
    fn stay(text: impl Into<String>) -> Self {
        Self {
            reply: Reply::new(text),
            end_session: false,
        }
    }

    fn end(text: impl Into<String>) -> Self {
        Self {
            reply: Reply::new(text),
            end_session: true,
        }
    }
}

/// Shared collaborators for every turn: the session repository, the remote
/// backend, and the optional advisor contact handle.
pub struct AppContext {
    pub sessions: Box<dyn SessionStore>,
    pub backend: Box<dyn Backend>,
    pub advisor_contact: Option<String>,
}

/// Process one inbound message end to end: load the session, run the state
/// machine, persist or drop the session, and return the reply text.
///
/// Any error escaping the turn is logged, answered with a generic apology,
/// and the session is removed so the user starts over.
pub async fn process_message(ctx: &AppContext, conversation_id: &str, text: &str) -> String {
    let mut session = ctx.sessions.load_or_create(conversation_id).await;

    match handle_turn(
        &mut session,
        text,
        ctx.backend.as_ref(),
        ctx.advisor_contact.as_deref(),
    )
    .await
    {
        Ok(outcome) => {
            if outcome.end_session {
                info!(conversation_id = %conversation_id, "Conversation finished");
                ctx.sessions.remove(conversation_id).await;
            } else {
                ctx.sessions.save(conversation_id, session).await;
            }
            outcome.reply.text
        }
        Err(e) => {
            error!(conversation_id = %conversation_id, error = %e, "Turn failed; resetting session");
            ctx.sessions.remove(conversation_id).await;
            t("fatal-error")
        }
    }
}

/// Advance the conversation one step. Consumes the trimmed input, produces
/// exactly one reply, and may mutate the order or call the matchers and the
/// order writer.
pub async fn handle_turn(
    session: &mut Session,
    input: &str,
    backend: &dyn Backend,
    advisor_contact: Option<&str>,
) -> Result<TurnOutcome> {
    let input = input.trim();
    // Commands compare on normalized text so MENÚ, Menú and menu all match.
    // Free-text fields keep the trimmed original.
    let command = normalize(input);

    if command == "menu" && !matches!(session.state, ConversationState::AwaitingStart) {
        session.state = ConversationState::AwaitingMainMenu;
        return Ok(TurnOutcome::stay(t("main-menu")));
    }

    let outcome = match session.state.clone() {
        ConversationState::AwaitingStart => {
            if command == "hola" || command == "/start" {
                session.state = ConversationState::AwaitingMainMenu;
                TurnOutcome::stay(t("main-menu"))
            } else {
                TurnOutcome::stay(t("start-prompt"))
            }
        }

        ConversationState::AwaitingMainMenu => match command.as_str() {
            "1" => {
                session.state = ConversationState::AwaitingName;
                TurnOutcome::stay(t("ask-name"))
            }
            "2" => {
                session.state = ConversationState::AwaitingFaqQuestion;
                TurnOutcome::stay(t("faq-prompt"))
            }
            "3" => advisor_handoff(advisor_contact),
            "fin" => TurnOutcome::end(t("farewell")),
            _ => TurnOutcome::stay(t("menu-invalid")),
        },

        ConversationState::AwaitingName => {
            if input.is_empty() {
                TurnOutcome::stay(t("ask-name"))
            } else {
                session.order.customer_name = input.to_string();
                session.state = ConversationState::AwaitingAddress;
                TurnOutcome::stay(t("ask-address"))
            }
        }

        ConversationState::AwaitingAddress => {
            if input.is_empty() {
                TurnOutcome::stay(t("ask-address"))
            } else {
                session.order.address = input.to_string();
                session.state = ConversationState::AwaitingPhone;
                TurnOutcome::stay(t("ask-phone"))
            }
        }

        ConversationState::AwaitingPhone => {
            if input.is_empty() {
                TurnOutcome::stay(t("ask-phone"))
            } else {
                session.order.phone = input.to_string();
                session.state = ConversationState::AwaitingProduct;
                TurnOutcome::stay(t("ask-product"))
            }
        }

        ConversationState::AwaitingProduct => {
            if command == "fin" {
                finalize_order(&session.order, backend).await
            } else if input.is_empty() {
                TurnOutcome::stay(t("product-prompt"))
            } else {
                handle_product_search(session, backend, input).await
            }
        }

        ConversationState::AwaitingProductChoice { matches } => match command.parse::<usize>() {
            Ok(choice) if (1..=matches.len()).contains(&choice) => {
                let selected = matches[choice - 1].clone();
                let reply = t_args("product-chosen", &[("name", selected.name.as_str())]);
                session.state = ConversationState::AwaitingQuantity { selected, matches };
                TurnOutcome::stay(reply)
            }
            _ => TurnOutcome::stay(t("product-choice-invalid")),
        },

        ConversationState::AwaitingQuantity { selected, matches } => {
            match command.parse::<i64>() {
                Ok(quantity) if quantity > 0 => {
                    let line_value =
                        session
                            .order
                            .add_item(&selected.name, quantity, selected.unit_value);
                    let summary = t_args(
                        "item-added",
                        &[
                            ("name", selected.name.as_str()),
                            ("quantity", &quantity.to_string()),
                            ("unit", &format_money(selected.unit_value)),
                            ("line", &format_money(line_value)),
                            ("total", &format_money(session.order.total)),
                        ],
                    );

                    if matches.len() > 1 {
                        let follow_up = t("another-from-list");
                        session.state = ConversationState::AwaitingAnotherFromList { matches };
                        TurnOutcome::stay(format!("{summary}\n\n{follow_up}"))
                    } else {
                        session.state = ConversationState::AwaitingProduct;
                        TurnOutcome::stay(format!("{summary}\n\n{}", t("ask-another-product")))
                    }
                }
                _ => TurnOutcome::stay(t("quantity-invalid")),
            }
        }

        ConversationState::AwaitingAnotherFromList { matches } => {
            if command == "fin" {
                finalize_order(&session.order, backend).await
            } else if command == "no" {
                session.state = ConversationState::AwaitingProduct;
                TurnOutcome::stay(t("product-prompt"))
            } else {
                match command.parse::<usize>() {
                    Ok(choice) if (1..=matches.len()).contains(&choice) => {
                        let selected = matches[choice - 1].clone();
                        let reply = t_args("product-chosen", &[("name", selected.name.as_str())]);
                        session.state = ConversationState::AwaitingQuantity { selected, matches };
                        TurnOutcome::stay(reply)
                    }
                    _ => TurnOutcome::stay(t("another-from-list-invalid")),
                }
            }
        }

        ConversationState::AwaitingFaqQuestion => {
            if input.is_empty() {
                TurnOutcome::stay(t("faq-prompt"))
            } else {
                match matching::find_faq_answer(backend, input).await {
                    Some(answer) => {
                        TurnOutcome::stay(format!("{answer}\n\n{}", t("faq-followup")))
                    }
                    None => {
                        session.state = ConversationState::AwaitingFaqRetryChoice;
                        TurnOutcome::stay(t("faq-no-match"))
                    }
                }
            }
        }

        ConversationState::AwaitingFaqRetryChoice => match command.as_str() {
            "1" | "si" => {
                session.state = ConversationState::AwaitingFaqQuestion;
                TurnOutcome::stay(t("faq-retry"))
            }
            "2" => advisor_handoff(advisor_contact),
            _ => TurnOutcome::stay(t("faq-retry-invalid")),
        },
    };

    Ok(outcome)
}

/// Run the product matcher and move the session according to the match
/// count: zero keeps asking, one auto-selects, several present a list.
async fn handle_product_search(
    session: &mut Session,
    backend: &dyn Backend,
    query: &str,
) -> TurnOutcome {
    let products = matching::find_products(backend, query).await;

    match products.len() {
        0 => TurnOutcome::stay(t_args("product-not-found", &[("query", query)])),
        1 => {
            let selected = products[0].clone();
            let reply = t_args(
                "product-single-found",
                &[
                    ("name", selected.name.as_str()),
                    ("price", &format_money(selected.unit_value)),
                ],
            );
            session.state = ConversationState::AwaitingQuantity {
                selected,
                matches: products,
            };
            TurnOutcome::stay(reply)
        }
        _ => {
            let reply = format!("{}\n\n{}", t("product-list-header"), product_list(&products));
            session.state = ConversationState::AwaitingProductChoice { matches: products };
            TurnOutcome::stay(reply)
        }
    }
}

/// Render the 1-indexed candidate list the user picks from.
fn product_list(products: &[Product]) -> String {
    products
        .iter()
        .enumerate()
        .map(|(index, product)| {
            format!(
                "*{}.* {} - ${}",
                index + 1,
                product.name,
                format_money(product.unit_value)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn advisor_handoff(advisor_contact: Option<&str>) -> TurnOutcome {
    match advisor_contact {
        Some(contact) => TurnOutcome::end(t_args("advisor-contact", &[("contact", contact)])),
        None => TurnOutcome::stay(t("advisor-unavailable")),
    }
}

/// Finalize the order: empty orders send the "nothing added" message without
/// touching the backend; otherwise the order is written and the user gets
/// the full summary or a failure notice. Terminal either way.
async fn finalize_order(order: &Order, backend: &dyn Backend) -> TurnOutcome {
    if order.items.is_empty() {
        return TurnOutcome::end(t("order-empty"));
    }

    if !orders::save_order(backend, order).await {
        return TurnOutcome::end(t("order-failed"));
    }

    TurnOutcome::end(order_summary(order))
}

fn order_summary(order: &Order) -> String {
    let mut summary = format!(
        "{}\n\n{}\n\n{}\n- Nombre: {}\n- Dirección: {}\n- Celular: {}\n\n{}\n",
        t("order-success-title"),
        t("order-summary-header"),
        t("order-customer-header"),
        order.customer_name,
        order.address,
        order.phone,
        t("order-products-header"),
    );

    for item in &order.items {
        summary.push_str(&format!(
            "- {} (x{}) - *${}*\n",
            item.product_name,
            item.quantity,
            format_money(item.line_value)
        ));
    }

    summary.push_str(&format!(
        "\n{}\n\n{}",
        t_args("order-total", &[("total", format_money(order.total).as_str())]),
        t("order-thanks"),
    ));

    summary
}
