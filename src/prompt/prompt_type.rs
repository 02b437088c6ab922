crate::define_closed_id_enum! {
    /// Semantic category of a game-AI request.
    ///
    /// Declaration order is significant: it is the final tie-break when two
    /// signatures match a request equally well, and the iteration order of
    /// every per-type report.
    PromptType {
        CharacterProfileUpdate => "character_profile_update",
        DialogueResponse => "dialogue_response",
        DialogueSpeakerSelector => "dialogue_speaker_selector",
        DynamicBioUpdate => "dynamic_bio_update",
        EvaluateMemoryRelevance => "evaluate_memory_relevance",
        EvaluateMood => "evaluate_mood",
        GamemasterActionSelector => "gamemaster_action_selector",
        GenerateSearchQuery => "generate_search_query",
        MemoryBuilder => "memory_builder",
        MoodEvaluator => "mood_evaluator",
        NativeActionSelector => "native_action_selector",
        NativeDialogueTransformer => "native_dialogue_transformer",
        PlayerDialogue => "player_dialogue",
        PlayerDialogueTargetSelector => "player_dialogue_target_selector",
        PlayerThoughts => "player_thoughts",
        /// Fallback bucket for requests no signature recognizes
        Unknown => "unknown",
    }
}

impl PromptType {
    pub fn is_unknown(&self) -> bool {
        *self == PromptType::Unknown
    }

    /// Every type that can carry a signature (all variants except `Unknown`).
    pub fn known() -> impl Iterator<Item = PromptType> {
        Self::all_variants()
            .iter()
            .copied()
            .filter(|prompt_type| !prompt_type.is_unknown())
    }
}
