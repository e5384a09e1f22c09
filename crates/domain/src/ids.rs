/// A stable identifier for a chat item. Distinct from the short request/speech
/// ids minted by `va_util::shortuuid` — chat item ids are plain UUIDs since
/// they are persisted and diffed, not logged on a hot path.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
