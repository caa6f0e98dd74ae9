//! Bot-facing wording (Vietnamese)

pub const WELCOME: &str = "Xin chào! Tôi là trợ lý thực vật. Bạn có thể hỏi tôi về các loài thực vật hoặc tải lên một hoặc nhiều hình ảnh để tôi nhận diện.";

pub const ANSWERING_DIRECT: &str = "Đang xử lý câu hỏi của bạn...";
pub const ANSWERING_SELECTED: &str = "Đang trả lời câu hỏi của bạn...";

pub const SELECT_TO_CONTINUE_QUESTION: &str =
    "Vui lòng chọn loài thực vật phù hợp để tiếp tục với câu hỏi của bạn.";
pub const SELECT_TO_CONTINUE: &str = "Vui lòng chọn loài thực vật phù hợp để tiếp tục.";

pub const NO_MATCH: &str = "Không tìm thấy loài thực vật nào phù hợp với hình ảnh này. Vui lòng thử lại với hình ảnh khác.";

pub const FALLBACK_ANSWER: &str = "Xin lỗi, tôi không có thông tin để trả lời câu hỏi này.";

pub const INVALID_FILES: &str = "Vui lòng chọn file hình ảnh hợp lệ (JPG, PNG, etc.)";

pub fn classifying(image_count: usize) -> String {
    format!("Đang xử lý và phân loại {image_count} hình ảnh...")
}

pub fn selection_prompt(question_pending: bool) -> &'static str {
    if question_pending {
        SELECT_TO_CONTINUE_QUESTION
    } else {
        SELECT_TO_CONTINUE
    }
}

pub fn classification_failed(reason: &str) -> String {
    format!("Lỗi khi phân loại hình ảnh: {reason}")
}

pub fn answer_failed(reason: &str) -> String {
    format!("Lỗi khi xử lý câu hỏi: {reason}")
}

pub fn selected(label: &str) -> String {
    format!("Bạn đã chọn: {label}")
}

pub fn ask_about(label: &str) -> String {
    format!("Bạn có thể đặt câu hỏi về loài {label} này.")
}
