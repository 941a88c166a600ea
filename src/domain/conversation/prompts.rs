//! Prompt catalog for the pipeline steps.
//!
//! Spanish-language templates keyed by question slot, plus the render
//! helpers the steps call. Follows the intake copy of the live service;
//! wording can be tuned without touching step logic.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::state::QuestionSlot;

// ----- Fixed texts -----

/// Welcome shown when the session opens on the plan-type question.
const GREETING_PLAN_TYPE: &str = "¡Hola! Vamos a comenzar a armar plan de retiro.\n\
Lo primero es elegir tu tipo de plan. Tenés tres opciones:\n\n\
Monto final → definís cuánto dinero querés tener acumulado al final del plazo. Ej: \"quiero llegar a 10 millones en 20 años\".\n\n\
Renta → pensás en términos de ingresos mensuales cuando ya no trabajes. Ej: \"quiero cobrar 300.000 pesos por mes\".\n\n\
Duración → elegís el tiempo que querés invertir (por ejemplo 15 años) y vemos cuánto podrías acumular según lo que aportes.\n\n\
Elegí la opción que más se parezca a cómo imaginás tu futuro. No te preocupes, después vas a poder modificar todo lo que quieras.\n\n\
Y si no lo tenés del todo claro, podés preguntarme lo que quieras — estoy acá para ayudarte a decidir.";

const FALLBACK_QUESTION: &str = "tu plan de retiro";

const RESPONDER_FALLBACK: &str = "Disculpá, tuve un problema para generar la respuesta en este \
momento. ¿Podés repetir tu consulta?";

const FAREWELL_FALLBACK: &str =
    "Perfecto, has completado tu consulta. ¡Que tengas un excelente día!";

const CLOSED_NOTICE: &str = "Esta conversación ya está cerrada. Tu consulta quedó registrada. \
¡Gracias por participar!";

const CONFIRMATION_NUDGE: &str = "Por favor confirma mi elección";

const FAREWELL_NUDGE: &str = "Genera un mensaje de despedida personalizado";

const SUMMARY_CREATE: &str = "Crea un resumen de la conversación arriba:";

const SUMMARY_EXTEND: &str = "Extiende el resumen teniendo en cuenta los nuevos mensajes arriba:";

// ----- Catalogs -----

static GREETINGS: Lazy<HashMap<QuestionSlot, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(QuestionSlot::PlanType, GREETING_PLAN_TYPE);
    map.insert(QuestionSlot::Goal, "¿Cuál es tu objetivo específico?");
    map.insert(
        QuestionSlot::GoalFinalAmount,
        "¿Qué monto final querés alcanzar al terminar tu plan?",
    );
    map.insert(
        QuestionSlot::GoalMonthlyIncome,
        "¿Qué renta mensual querés cobrar cuando te retires?",
    );
    map.insert(
        QuestionSlot::GoalDuration,
        "¿Durante cuántos años querés sostener tu plan?",
    );
    map.insert(QuestionSlot::InitialAmount, "¿Con qué monto inicial contás?");
    map.insert(
        QuestionSlot::MonthlyContribution,
        "¿Cuánto podés aportar por mes?",
    );
    map
});

static QUESTION_TEXTS: Lazy<HashMap<QuestionSlot, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(
        QuestionSlot::PlanType,
        "¿Qué tipo de plan de retiro querés: monto final, renta o duración?",
    );
    map.insert(QuestionSlot::Goal, "¿Cuál es tu objetivo específico?");
    map.insert(
        QuestionSlot::GoalFinalAmount,
        "¿Qué monto final querés alcanzar al terminar tu plan?",
    );
    map.insert(
        QuestionSlot::GoalMonthlyIncome,
        "¿Qué renta mensual querés cobrar cuando te retires?",
    );
    map.insert(
        QuestionSlot::GoalDuration,
        "¿Durante cuántos años querés sostener tu plan?",
    );
    map.insert(QuestionSlot::InitialAmount, "¿Con qué monto inicial contás?");
    map.insert(
        QuestionSlot::MonthlyContribution,
        "¿Cuánto podés aportar por mes?",
    );
    map
});

// ----- Lookups -----

/// Fixed welcome text for the active slot. Sessions opened without a slot
/// get the plan-type welcome, which is where every intake starts.
pub fn greeting(slot: Option<QuestionSlot>) -> &'static str {
    slot.and_then(|s| GREETINGS.get(&s).copied())
        .unwrap_or(GREETING_PLAN_TYPE)
}

/// Human-readable question text for the active slot, with the generic
/// fallback used when no slot is stored.
pub fn question_text(slot: Option<QuestionSlot>) -> &'static str {
    slot.and_then(|s| QUESTION_TEXTS.get(&s).copied())
        .unwrap_or(FALLBACK_QUESTION)
}

// ----- Render helpers -----

/// System prompt asking the model whether the user answered the active question.
///
/// The plan-type slot gets a specialized template that names the three
/// options; every other slot uses the generic detector.
pub fn reason_detection_prompt(slot: QuestionSlot, question: &str, user_message: &str) -> String {
    match slot {
        QuestionSlot::PlanType => format!(
            "Analiza si el usuario ha respondido a la pregunta.\n\n\
             PREGUNTA: {question}\n\n\
             RESPUESTA DEL USUARIO: {user_message}\n\n\
             INSTRUCCIÓN: Responde ÚNICAMENTE con un JSON en este formato exacto:\n\
             {{\"has_response\": 1, \"reason\": \"Monto final\"}} si el usuario elige la opción de monto final\n\
             {{\"has_response\": 1, \"reason\": \"Renta\"}} si el usuario elige la opción de renta\n\
             {{\"has_response\": 1, \"reason\": \"Duración\"}} si el usuario elige la opción de duración\n\
             {{\"has_response\": 0, \"reason\": null}} si el usuario NO eligió una opción específica\n\n\
             ## CRITERIOS PARA RESPUESTA VÁLIDA (has_response: 1):\n\
             - \"Monto final\" → cuando menciona monto final, monto objetivo, cantidad final, dinero acumulado\n\
             - \"Renta\" → cuando menciona renta, ingreso mensual, cobrar por mes\n\
             - \"Duración\" → cuando menciona duración, tiempo de inversión, plazo, años\n\n\
             ## CRITERIOS PARA RESPUESTA INVÁLIDA (has_response: 0):\n\
             - Respuestas vagas: \"dudas\", \"no sé\", \"ni idea\"\n\
             - Respuestas genéricas: \"ok\", \"bien\", \"gracias\"\n\
             - Expresiones de confusión: \"tengo dudas\", \"estoy confundido\"\n\
             - Respuestas que no eligen una opción específica\n\n\
             RESPUESTA:",
        ),
        _ => format!(
            "Analiza si el usuario ha respondido a la pregunta.\n\n\
             PREGUNTA: {question}\n\n\
             RESPUESTA DEL USUARIO: {user_message}\n\n\
             INSTRUCCIÓN: Responde ÚNICAMENTE con un JSON en este formato exacto:\n\
             {{\"has_response\": 1, \"reason\": \"respuesta concreta del usuario\"}} si la respuesta contesta claramente la pregunta\n\
             {{\"has_response\": 0, \"reason\": null}} si la respuesta es vaga, incompleta o no contesta\n\n\
             CRITERIOS (has_response: 1): la respuesta contiene datos o una elección explícita relevante a la pregunta.\n\
             CRITERIOS (has_response: 0): expresiones vagas (\"no sé\", \"tengo dudas\", \"después veo\", \"ok\"), o no hay elección/dato concreto.\n\n\
             RESPUESTA:",
        ),
    }
}

/// System prompt asking the model to request confirmation of the detected answer.
pub fn confirmation_prompt(question: &str, reason: &str) -> String {
    format!(
        "Eres un agente confirmador experto en planificación de retiro.\n\n\
         Pregunta actual: {question}\n\
         El usuario ha elegido: {reason}\n\n\
         Tu tarea es pedirle que confirme esta elección de manera clara y amigable.\n\n\
         INSTRUCCIONES:\n\
         1. Confirma que entendiste su elección\n\
         2. Pregunta si está seguro de su decisión\n\
         3. Ofrece la opción de cambiar de opinión\n\
         4. Mantén un tono cercano y profesional\n\
         5. No seas muy largo, solo 2-3 oraciones\n\n\
         RESPUESTA:",
    )
}

/// Fixed user-side nudge sent with the confirmation request.
pub fn confirmation_nudge() -> &'static str {
    CONFIRMATION_NUDGE
}

/// Deterministic confirmation request used when the model is unavailable.
pub fn confirmation_fallback(reason: &str) -> String {
    format!(
        "Entiendo que tu elección es: {reason}. ¿Estás seguro de que querés continuar \
         con esta opción? Si preferís, podés cambiar de opinión.",
    )
}

/// System prompt classifying the user's reaction to a confirmation request.
pub fn close_evaluation_prompt() -> &'static str {
    "Eres un agente que analiza la respuesta del usuario a una pregunta de confirmación.\n\n\
     ## TU TAREA:\n\
     Analizar si el usuario:\n\
     1. Confirmó su elección\n\
     2. Tiene dudas y necesita más información\n\
     3. Necesita que se le vuelva a pedir confirmación\n\n\
     ## OPCIONES:\n\n\
     ### \"end_conversation\"\n\
     - Cuándo: el usuario confirmó claramente (sí, correcto, perfecto, etc.)\n\n\
     ### \"profesor\"\n\
     - Cuándo: el usuario tiene dudas o pide más información\n\n\
     ### \"confirmation\"\n\
     - Cuándo: el usuario no confirmó ni preguntó, necesita que se le pida de nuevo\n\n\
     ## REGLA DE SEGURIDAD:\n\
     Si no estás seguro de cuál de las 3 opciones es la correcta, elige \"profesor\".\n\n\
     ## RESPUESTA:\n\
     Responde ÚNICAMENTE con un JSON:\n\
     {\"decision\": \"end_conversation\"} o {\"decision\": \"profesor\"} o {\"decision\": \"confirmation\"}\n\n\
     ## EJEMPLOS:\n\
     - Usuario dice \"sí, perfecto\" → {\"decision\": \"end_conversation\"}\n\
     - Usuario dice \"¿puedes explicarme más?\" → {\"decision\": \"profesor\"}\n\
     - Usuario dice \"no sé\" → {\"decision\": \"confirmation\"}\n\
     - Usuario dice algo confuso → {\"decision\": \"profesor\"} (regla de seguridad)\n\n\
     RESPUESTA:"
}

/// System prompt for the free-form teaching reply.
///
/// The plan-type slot keeps the focused three-options script; other slots
/// get the generic profesor persona primed with the readable question. A
/// non-empty running summary is appended as prior context.
pub fn responder_system_prompt(slot: Option<QuestionSlot>, summary: &str) -> String {
    let base = match slot {
        Some(QuestionSlot::PlanType) | None => "Eres un profesor experto en planificación de \
             retiro. Tu función principal en este momento es ayudar al usuario a elegir entre \
             los tres tipos de plan de retiro disponibles: Monto final, Renta o Duración.\n\n\
             Explica cada opción con claridad y ejemplos concretos.\n\n\
             Si el usuario tiene dudas, profundiza en las diferencias y ayúdalo a imaginar qué \
             escenario se ajusta mejor a su vida.\n\n\
             No hables de otros temas financieros por ahora: céntrate únicamente en aclarar y \
             orientar sobre estas tres alternativas.\n\n\
             Usa un tono cercano, educativo y accesible, como un profesor particular que \
             acompaña paso a paso."
            .to_string(),
        Some(other) => format!(
            "Eres un profesor experto en planificación de retiro. El usuario está respondiendo \
             la siguiente pregunta: {question}\n\n\
             Aclará sus dudas con claridad y ejemplos concretos, sin desviarte a otros temas \
             financieros.\n\n\
             Usa un tono cercano, educativo y accesible, como un profesor particular que \
             acompaña paso a paso.",
            question = question_text(Some(other)),
        ),
    };

    if summary.is_empty() {
        base
    } else {
        format!("{base}\n\nResumen de la conversación anterior: {summary}")
    }
}

/// Fixed apology used when the teaching reply cannot be generated.
pub fn responder_fallback() -> &'static str {
    RESPONDER_FALLBACK
}

/// System prompt asking the model for a personalized farewell.
pub fn farewell_prompt(question: &str, reason: &str) -> String {
    format!(
        "Eres un asistente experto en planificación de retiro que genera mensajes de \
         despedida personalizados.\n\n\
         ## CONTEXTO:\n\
         - Pregunta que se le hizo al usuario: {question}\n\
         - Opción que eligió el usuario: {reason}\n\n\
         ## TU TAREA:\n\
         Generar un mensaje de despedida personalizado, amigable y profesional que:\n\
         1. Confirme que el usuario completó su consulta exitosamente\n\
         2. Mencione la opción que eligió (de forma natural)\n\
         3. Sea cálido y alentador\n\
         4. Sea breve pero completo (máximo 3-4 frases)\n\n\
         ## ESTILO:\n\
         - Tono: amigable, profesional y alentador\n\
         - Lenguaje: claro y comprensible\n\
         - Cierre: con un deseo positivo\n\n\
         RESPUESTA:",
    )
}

/// Fixed user-side nudge sent with the farewell request.
pub fn farewell_nudge() -> &'static str {
    FAREWELL_NUDGE
}

/// Generic closing used when the farewell cannot be personalized.
pub fn farewell_fallback() -> &'static str {
    FAREWELL_FALLBACK
}

/// Notice for turns that arrive after the conversation closed.
pub fn closed_notice() -> &'static str {
    CLOSED_NOTICE
}

/// Prompt creating the first summary of a conversation.
pub fn summary_create_prompt() -> &'static str {
    SUMMARY_CREATE
}

/// Prompt extending an existing summary with the newer messages.
pub fn summary_extend_prompt(existing_summary: &str) -> String {
    format!(
        "Este es el resumen de la conversación hasta ahora: {existing_summary}\n\n{SUMMARY_EXTEND}",
    )
}
