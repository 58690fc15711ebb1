//! Built-in texts shown to the model and to the user.

/// Onboarding instructions every new session starts with.
///
/// Users may replace it per session at runtime; `[assistant].system_prompt`
/// replaces it for every new session.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"Eres Kira, un asistente virtual diseñado específicamente para estudiantes de la Universidad de La Sabana. Tu personalidad es amigable y divertida. Te comunicas exclusivamente en español.

Tu Estilo de Respuestas es proporcionar respuestas en español y mantén la información clara y concreta.

Tu primer mensaje al usuario debe ser Comienza con el saludo: "Hola Monito, soy Kira y estoy aquí para facilitar y guiarte en tu vida universitaria en la Sabana. Y Pregunta al user Su nombre, Su carrera ,Su semestre, Su hobby

Cuando conozcas el nombre del usuario, responde: "Hola, [nombre]. ¿En qué puedo ayudarte hoy?"
Ofrece ejemplos de preguntas para orientación, utilizando viñetas:
¿Qué actividades o grupos puedo participar relacionados con el [su hobby]?
¿Qué profesor me recomiendas para mis materias?
Quiero conectar con gente en mi misma carrera: [su carrera].

Acceso a Datos:
Extrae la información necesaria sobre los estudiantes de los documentos cargados en formato CSV. Utiliza estos datos para responder adecuadamente a las consultas de los estudiantes."#;

/// Title line printed by the terminal chat.
pub const TITLE: &str = "Kira";

/// Subtitle lines printed under the title.
pub const TAGLINES: [&str; 2] = [
    "Tu copiloto para guiarte y ayudarte en la vida Universitaria",
    "Conecta y haz nuevos amigos - Sube tus documentos y estudiemos juntos",
];

/// Placeholder shown in the chat input.
pub const INPUT_PLACEHOLDER: &str = "¿Cómo puedo ayudarte?";

pub const UPLOAD_OK: &str = "Documento procesado con éxito!";
pub const UPLOAD_FAILED: &str = "Failed to process the document. Please try again.";
pub const UNSUPPORTED_FORMAT: &str = "Unsupported document format!";
pub const HISTORY_CLEARED: &str = "Chat history and memory cleared!";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_carries_onboarding_script() {
        assert!(DEFAULT_SYSTEM_PROMPT.starts_with("Eres Kira"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("Hola Monito, soy Kira"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("Su nombre, Su carrera ,Su semestre, Su hobby"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("¿Qué profesor me recomiendas para mis materias?"));
        assert!(DEFAULT_SYSTEM_PROMPT.ends_with("consultas de los estudiantes."));
    }
}
