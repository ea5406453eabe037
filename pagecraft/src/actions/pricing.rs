use indextree::NodeId;

use super::{NewPlan, PlanSpec, PlanType, PlanUpdate, Price};
use crate::config::EngineConfig;
use crate::dom::Document;
use crate::error::EditError;

fn container(doc: &Document, config: &EngineConfig) -> Result<NodeId, EditError> {
    doc.element_by_id(&config.container_id)
        .ok_or_else(|| EditError::not_found(format!("#{} container", config.container_id)))
}

fn card_at(doc: &Document, config: &EngineConfig, index: usize) -> Result<NodeId, EditError> {
    let cards = doc.elements_with_class(&config.plan_class);
    cards.get(index).copied().ok_or_else(|| {
        EditError::not_found(format!(
            "plan at index {index} (the page has {} plans)",
            cards.len()
        ))
    })
}

fn card_class(config: &EngineConfig, extra: Option<&str>) -> String {
    match extra {
        Some(extra) => format!("{} {}", config.plan_class, extra),
        None => config.plan_class.clone(),
    }
}

/// Price text for update and bulk actions.
fn price_text(config: &EngineConfig, plan_type: PlanType, price: Option<&Price>) -> String {
    match plan_type {
        PlanType::Free => config.free_label.clone(),
        PlanType::Paid => config.format_price(price.map(Price::raw).unwrap_or("0")),
    }
}

pub(super) fn add_plan(
    doc: &mut Document,
    config: &EngineConfig,
    plan: &NewPlan,
    plan_id: &str,
) -> Result<String, EditError> {
    let container = container(doc, config)?;
    let price = match &plan.price {
        Price::Display(text) => text.clone(),
        Price::Amount(amount) => config.format_price(amount),
    };

    let class = card_class(config, plan.recommended.then_some("recommended"));
    let card = doc.new_element("div", &[("class", class.as_str()), ("data-plan", plan_id)]);
    doc.append_text_element(
        card,
        "h3",
        &[("class", "plan-name"), ("contenteditable", "true")],
        &plan.title,
    );
    doc.append_text_element(
        card,
        "div",
        &[("class", "plan-price"), ("contenteditable", "true")],
        &price,
    );
    let features = doc.new_element("ul", &[("class", "plan-features")]);
    for feature in &plan.features {
        doc.append_text_element(features, "li", &[], feature);
    }
    doc.append_child(card, features);
    doc.append_child(container, card);

    Ok(format!("Added plan {} ({price})", plan.title))
}

pub(super) fn delete_plan(
    doc: &mut Document,
    config: &EngineConfig,
    index: usize,
) -> Result<String, EditError> {
    let card = card_at(doc, config, index)?;
    let name = doc
        .first_with_class(card, "plan-name")
        .map(|n| doc.text_content(n).trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("#{}", index + 1));
    doc.remove(card);
    Ok(format!("Deleted plan {name}"))
}

pub(super) fn update_plan(
    doc: &mut Document,
    config: &EngineConfig,
    update: &PlanUpdate,
) -> Result<String, EditError> {
    let card = card_at(doc, config, update.index)?;

    if let Some(name) = &update.name
        && let Some(node) = doc.first_with_class(card, "plan-name")
    {
        doc.set_text_content(node, name);
    }

    if (update.price.is_some() || update.plan_type.is_some())
        && let Some(node) = doc.first_with_class(card, "plan-price")
    {
        let plan_type = update.plan_type.unwrap_or(PlanType::Paid);
        let text = price_text(config, plan_type, update.price.as_ref());
        doc.set_text_content(node, &text);
    }

    if let Some(description) = &update.description
        && let Some(node) = doc.first_with_class(card, "plan-description")
    {
        doc.set_text_content(node, description);
    }

    Ok(format!("Updated plan #{}", update.index + 1))
}

pub(super) fn reorder_plans(
    doc: &mut Document,
    config: &EngineConfig,
    order: &[usize],
) -> Result<String, EditError> {
    let container = container(doc, config)?;
    let cards = doc.elements_with_class(&config.plan_class);
    if cards.is_empty() {
        return Err(EditError::not_found("pricing plans"));
    }
    if order.len() != cards.len() {
        return Err(EditError::validation(format!(
            "order has {} entries but the page has {} plans",
            order.len(),
            cards.len()
        )));
    }
    let mut seen = vec![false; cards.len()];
    for &i in order {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(EditError::validation(format!("order repeats index {i}")));
            }
            None => {
                return Err(EditError::validation(format!(
                    "order index {i} is out of range"
                )));
            }
        }
    }

    for &card in &cards {
        doc.detach(card);
    }
    for &i in order {
        doc.append_child(container, cards[i]);
    }

    Ok("Reordered plans".to_string())
}

pub(super) fn bulk_update(
    doc: &mut Document,
    config: &EngineConfig,
    plans: &[PlanSpec],
    id_base: &str,
) -> Result<String, EditError> {
    let container = container(doc, config)?;
    doc.clear_children(container);

    for (i, plan) in plans.iter().enumerate() {
        let class = card_class(config, (i == 0).then_some("selected"));
        let id = format!("{id_base}-{i}");
        let card = doc.new_element("div", &[("class", class.as_str()), ("data-plan", id.as_str())]);
        doc.append_text_element(
            card,
            "h3",
            &[("class", "plan-name"), ("contenteditable", "true")],
            &plan.name,
        );
        doc.append_text_element(
            card,
            "div",
            &[("class", "plan-price"), ("contenteditable", "true")],
            &price_text(config, plan.plan_type, Some(&plan.price)),
        );
        doc.append_text_element(
            card,
            "p",
            &[("class", "plan-description"), ("contenteditable", "true")],
            &plan.description,
        );
        doc.append_child(container, card);
    }

    Ok(format!("Created {} plans", plans.len()))
}
