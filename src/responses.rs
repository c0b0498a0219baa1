//! Canned answers served when the backend is unreachable.

pub const DEFAULT_RESPONSE: &str = "Soy tu asistente especializado en DLLs. Puedo ayudarte con generación, debugging, optimización, ejemplos de código y conceptos. ¿En qué necesitas asistencia?";

const OFFLINE_RESPONSES: &[(&str, &str)] = &[
    ("hola", "¡Hola! Soy xpe.manager.ai, tu asistente especializado en DLLs. ¿En qué proyecto puedo ayudarte?"),
    ("dll", "Puedo ayudarte a crear DLLs de cualquier tipo: Runtime libraries, plugins, performance, security, network, o data access. ¿Qué tipo necesitas?"),
    ("debug", "Para debugging de DLLs, puedo ayudarte con: memory leaks, buffer overflows, stack corruption, access violations y más. ¿Qué problema específico tienes?"),
    ("optimiz", "Las optimizaciones que puedo aplicar incluyen: SIMD vectorización, memory pooling, cache optimization, threading seguro. ¿Qué función quieres optimizar?"),
    ("ejemplo", "Puedo mostrarte ejemplos de DLLs básicas, optimizadas, con SIMD, memory pooling, error handling y más. ¿Qué ejemplo específico necesitas?"),
    ("simd", "SIMD (Single Instruction Multiple Data) permite procesar múltiples datos simultáneamente. Puedo ayudarte a optimizar funciones con instrucciones SSE, AVX, etc."),
    ("memory", "Para gestión de memoria en DLLs: usar memory pooling, smart pointers, bounds checking, y herramientas como AddressSanitizer o Valgrind."),
];

/// Prompts offered by `/suggest`.
pub const SUGGESTIONS: &[&str] = &[
    "¿Cómo crear una DLL básica?",
    "Optimiza esta función para SIMD",
    "Tengo un memory leak, ¿cómo solucionarlo?",
    "Muéstrame un ejemplo de DLL",
];

#[derive(Debug, Clone)]
pub struct ResponseTable {
    entries: Vec<(String, String)>,
    default: String,
}

impl ResponseTable {
    /// Keywords are lowercased on insertion; order of `entries` is match priority.
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>, default: impl Into<String>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
            default: default.into(),
        }
    }

    pub fn offline() -> Self {
        Self::new(OFFLINE_RESPONSES.iter().copied(), DEFAULT_RESPONSE)
    }

    /// First entry whose keyword occurs in the lowercased input, else the default.
    pub fn resolve(&self, input: &str) -> &str {
        let lower = input.to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| lower.contains(keyword.as_str()))
            .map(|(_, response)| response.as_str())
            .unwrap_or(self.default.as_str())
    }
}

impl Default for ResponseTable {
    fn default() -> Self {
        Self::offline()
    }
}
