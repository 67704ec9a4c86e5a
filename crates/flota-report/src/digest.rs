// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Attention digests sent to coordinators: a plain-text list, an inline-styled HTML
//! email body, and a `mailto:` link for sending by hand.
//!
//! Both digests draw from [`digest_items`], so they always list the same plans in the
//! same order.

use flota_app::dates::format_display;
use flota_app::{Coordinator, Document, DueState, LookupId, LookupTable, PlanId, VehicleId};
use flota_app::{attention_list, evaluate_scope};
use time::Date;

const UNRESOLVED: &str = "N/A";
const ALL_SYSTEMS_TITLE: &str = "TODOS LOS SISTEMAS";
const TEXT_HEADER: &str = "MANTENIMIENTOS PENDIENTES/VENCIDOS:";
const ALL_CLEAR_TEXT: &str = "No hay mantenimientos vencidos ni pendientes para este sistema.";
const ALL_CLEAR_HTML: &str = "✅ Todos los mantenimientos están al día.";

const OVERDUE_COLOR: &str = "#ef4444";
const PENDING_COLOR: &str = "#f59e0b";
const CURRENT_COLOR: &str = "#10b981";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestItem {
    pub plan_id: PlanId,
    pub vehicle_id: VehicleId,
    pub license_plate: String,
    pub system: String,
    pub plan: String,
    pub state: DueState,
}

impl DigestItem {
    fn text_line(&self) -> String {
        let overdue = match self.state {
            DueState::Overdue { overdue_days } => format!(", {overdue_days} días vencido"),
            _ => String::new(),
        };
        format!(
            "- Vehículo {} ({}) [{}]: {} ({}{overdue})",
            self.vehicle_id,
            self.license_plate,
            self.system,
            self.plan,
            self.state.label()
        )
    }

    fn chip(&self) -> (&'static str, String) {
        match self.state {
            DueState::Overdue { overdue_days } => {
                (OVERDUE_COLOR, format!("{} ({overdue_days}d)", self.state.label()))
            }
            DueState::Pending => (PENDING_COLOR, self.state.label().to_owned()),
            DueState::Current | DueState::DueSoon { .. } => {
                (CURRENT_COLOR, self.state.label().to_owned())
            }
        }
    }
}

/// Plans needing attention within `system` (every system when `None`), most urgent first.
pub fn digest_items(document: &Document, system: Option<&LookupId>, today: Date) -> Vec<DigestItem> {
    attention_list(document, system, today)
        .into_iter()
        .map(|evaluation| DigestItem {
            plan_id: evaluation.plan.id.clone(),
            vehicle_id: evaluation.vehicle.id.clone(),
            license_plate: evaluation.vehicle.license_plate.clone(),
            system: document
                .system_label(evaluation.vehicle)
                .unwrap_or(UNRESOLVED)
                .to_owned(),
            plan: document
                .plan_label(evaluation.plan)
                .unwrap_or(UNRESOLVED)
                .to_owned(),
            state: evaluation.state,
        })
        .collect()
}

pub fn text_digest(document: &Document, system: Option<&LookupId>, today: Date) -> String {
    let items = digest_items(document, system, today);
    if items.is_empty() {
        return ALL_CLEAR_TEXT.to_owned();
    }
    let lines = items
        .iter()
        .map(DigestItem::text_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{TEXT_HEADER}\n\n{lines}")
}

/// System name for a scoped digest, or the all-systems title.
pub fn scope_title(document: &Document, system: Option<&LookupId>) -> String {
    match system {
        Some(id) => document
            .lookup_value(LookupTable::Systems, Some(id))
            .unwrap_or(UNRESOLVED)
            .to_owned(),
        None => ALL_SYSTEMS_TITLE.to_owned(),
    }
}

pub fn html_digest(document: &Document, system: Option<&LookupId>, today: Date) -> String {
    let evaluated = evaluate_scope(document, system, today).len();
    let items = digest_items(document, system, today);
    let attention = items.len();
    let in_time = evaluated.saturating_sub(attention);

    let mut html = String::new();
    html.push_str(
        "<div style=\"font-family: sans-serif; color: #1e293b; max-width: 600px; margin: 0 auto; \
         border: 1px solid #e2e8f0; border-radius: 8px; overflow: hidden;\">\n",
    );
    html.push_str(&format!(
        "<div style=\"background-color: #059669; color: white; padding: 24px; text-align: center;\">\n\
         <h2 style=\"margin: 0; font-size: 20px;\">Informe de Mantenimiento</h2>\n\
         <p style=\"margin: 8px 0 0 0; opacity: 0.9; font-weight: bold;\">{}</p>\n\
         <p style=\"margin: 4px 0 0 0; font-size: 12px;\">Generado el {}</p>\n\
         </div>\n",
        escape_html(&scope_title(document, system)),
        format_display(today)
    ));

    html.push_str(
        "<div style=\"display: grid; grid-template-columns: 1fr 1fr 1fr; gap: 10px; padding: 20px; \
         background-color: #f8fafc; border-bottom: 1px solid #e2e8f0; text-align: center;\">\n",
    );
    html.push_str(&tile("Vehículos", "#1e293b", evaluated));
    html.push_str(&tile("Vencidos", OVERDUE_COLOR, attention));
    html.push_str(&tile("Al día", CURRENT_COLOR, in_time));
    html.push_str("</div>\n");

    html.push_str("<div style=\"padding: 24px;\">\n");
    if items.is_empty() {
        html.push_str(&format!(
            "<div style=\"text-align: center; padding: 40px; color: #64748b;\">\n\
             <p style=\"font-size: 16px; margin: 0;\">{ALL_CLEAR_HTML}</p>\n\
             </div>\n"
        ));
    } else {
        html.push_str(&format!(
            "<h3 style=\"margin-top: 0; font-size: 16px; border-left: 4px solid {PENDING_COLOR}; \
             padding-left: 10px; color: #1e293b;\">Atención necesaria</h3>\n\
             <table style=\"width: 100%; border-collapse: collapse; font-size: 13px; margin-top: 15px;\">\n\
             <thead>\n<tr style=\"background-color: #f1f5f9; text-align: left;\">\n"
        ));
        for heading in ["Vehículo", "Sistema", "Tarea", "Estado"] {
            html.push_str(&format!(
                "<th style=\"padding: 10px; border-bottom: 2px solid #e2e8f0; color: #475569;\">{heading}</th>\n"
            ));
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");
        for item in &items {
            html.push_str(&table_row(item));
        }
        html.push_str("</tbody>\n</table>\n");
    }
    html.push_str("</div>\n");

    html.push_str(
        "<div style=\"background-color: #f1f5f9; padding: 16px; text-align: center; font-size: 11px; \
         color: #64748b; border-top: 1px solid #e2e8f0;\">\n\
         Este es un mensaje automático del Sistema de Gestión de Flota.\n\
         </div>\n</div>\n",
    );
    html
}

fn tile(label: &str, color: &str, value: usize) -> String {
    format!(
        "<div style=\"background: white; padding: 10px; border-radius: 6px; border: 1px solid #e2e8f0;\">\n\
         <div style=\"font-size: 11px; color: {color}; text-transform: uppercase; margin-bottom: 4px;\">{label}</div>\n\
         <div style=\"font-size: 18px; font-weight: bold; color: {color};\">{value}</div>\n\
         </div>\n"
    )
}

fn table_row(item: &DigestItem) -> String {
    const CELL: &str = "padding: 12px; border-bottom: 1px solid #e2e8f0;";
    let (color, chip) = item.chip();
    format!(
        "<tr data-plan=\"{}\">\n\
         <td style=\"{CELL} font-weight: bold;\">{}</td>\n\
         <td style=\"{CELL}\">{}</td>\n\
         <td style=\"{CELL}\">{}</td>\n\
         <td style=\"{CELL}\"><span style=\"background-color: {color}; color: white; padding: 4px 8px; \
         border-radius: 99px; font-size: 11px; font-weight: bold; text-transform: uppercase;\">{}</span></td>\n\
         </tr>\n",
        escape_html(item.plan_id.as_str()),
        escape_html(&item.license_plate),
        escape_html(&item.system),
        escape_html(&item.plan),
        escape_html(&chip)
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn mail_subject(today: Date) -> String {
    format!("Aviso: Mantenimientos de Flota - {}", format_display(today))
}

/// Plain-text body for one coordinator's scope.
pub fn mail_body(document: &Document, coordinator: &Coordinator, today: Date, app_url: &str) -> String {
    let scope = match coordinator.system_id.as_ref() {
        Some(system) => format!("el sistema {}", scope_title(document, Some(system))),
        None => "todos los sistemas".to_owned(),
    };
    format!(
        "Hola {},\n\nEste es el informe de mantenimientos pendientes para {scope}.\n\n{}\n\n\
         Accede a la aplicación para más detalles: {app_url}",
        coordinator.name,
        text_digest(document, coordinator.system_id.as_ref(), today)
    )
}

/// `mailto:` link with the subject and body percent-encoded and line breaks as CRLF.
pub fn mailto_link(document: &Document, coordinator: &Coordinator, today: Date, app_url: &str) -> String {
    let body = mail_body(document, coordinator, today, app_url)
        .split('\n')
        .map(|line| urlencoding::encode(line).into_owned())
        .collect::<Vec<_>>()
        .join("%0D%0A");
    format!(
        "mailto:{}?subject={}&body={body}",
        coordinator.email.trim(),
        urlencoding::encode(&mail_subject(today))
    )
}

#[cfg(test)]
mod tests {
    use super::{escape_html, html_digest, mailto_link, text_digest};
    use flota_app::{Document, LookupId};
    use time::macros::date;

    #[test]
    fn text_digest_lists_pending_before_overdue() {
        let text = text_digest(&Document::initial(), None, date!(2026 - 03 - 01));
        assert_eq!(
            text,
            "MANTENIMIENTOS PENDIENTES/VENCIDOS:\n\n\
             - Vehículo 0001 (1234ABC) [CADENAS]: Engrase 5ª Rueda (Pendiente)\n\
             - Vehículo 0001 (1234ABC) [CADENAS]: Engrase (Vencido, 15 días vencido)"
        );
    }

    #[test]
    fn empty_scope_reads_all_clear() {
        let system = LookupId::from("2");
        let text = text_digest(&Document::initial(), Some(&system), date!(2026 - 03 - 01));
        assert_eq!(text, "No hay mantenimientos vencidos ni pendientes para este sistema.");

        let html = html_digest(&Document::initial(), Some(&system), date!(2026 - 03 - 01));
        assert!(html.contains("CADENAS Y MINI"));
        assert!(html.contains("Todos los mantenimientos están al día."));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn html_digest_counts_and_colors() {
        let html = html_digest(&Document::initial(), None, date!(2026 - 03 - 01));
        assert!(html.contains("TODOS LOS SISTEMAS"));
        assert!(html.contains("Generado el 01/03/2026"));
        assert!(html.contains("Vencido (15d)"));
        assert!(html.contains("background-color: #f59e0b; color: white"));
        assert!(html.contains("background-color: #ef4444; color: white"));
        assert!(html.contains(">Al día</div>\n<div style=\"font-size: 18px; font-weight: bold; color: #10b981;\">0</div>"));
    }

    #[test]
    fn html_values_are_escaped() {
        let mut document = Document::initial();
        document.vehicles[0].license_plate = "<b>&".to_owned();
        let html = html_digest(&document, None, date!(2026 - 03 - 01));
        assert!(html.contains("&lt;b&gt;&amp;"));
        assert_eq!(escape_html("\"x'"), "&quot;x&#39;");
    }

    #[test]
    fn mailto_encodes_crlf_and_subject() {
        let document = Document::initial();
        let link = mailto_link(
            &document,
            &document.coordinators[0],
            date!(2026 - 03 - 01),
            "https://flota.example.com",
        );
        assert!(link.starts_with(
            "mailto:coordinador@ejemplo.com?subject=Aviso%3A%20Mantenimientos%20de%20Flota%20-%2001%2F03%2F2026&body=Hola%20"
        ));
        assert!(link.contains("%0D%0A%0D%0AEste%20es%20el%20informe"));
        assert!(link.contains("el%20sistema%20CADENAS."));
        assert!(!link.contains('\n'));
        assert!(link.ends_with("https%3A%2F%2Fflota.example.com"));
    }
}
