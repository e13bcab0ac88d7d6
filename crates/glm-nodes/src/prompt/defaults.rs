//! Built-in prompts and catalogs, one set per node.

use super::{BuiltinPrompt, PromptCatalog};

/// Text chat: expand a short text-to-video prompt into a full paragraph
/// covering subject, scene, motion, camera language, atmosphere, and style.
pub const TEXT_CHAT_PROMPT: BuiltinPrompt = BuiltinPrompt::new(
    "请根据以下提示内容，将文生视频的提示词扩写成一段完整的话。最终的视频提示词应包含六个核心要素：主体(主体描述)、场景(场景描述)、运动(运动描述)、镜头语言、氛围词和风格化。

主体描述是对主体外观特征细节的描述，可通过形容词或短句列举，例如“一位身着少数民族服饰的黑发苗族少女”或“一位来自异世界的飞天仙子，身着破旧却华丽的服饰，背后展开一对由废墟碎片构成的奇异翅膀”。场景描述是对主体所处环境特征细节的描述，可通过形容词或短句列举。运动描述是对运动特征细节的描述，包含运动的幅度、速率和运动作用的效果，例如“猛烈地摇摆”、“缓慢地移动”或“打碎了玻璃”。镜头语言包含景别、视角、镜头、运镜等。氛围词是对预期画面氛围的描述，例如“梦幻”、“孤独”或“宏伟”。风格化是对画面风格语言的描述，例如“赛博朋克”、“勾线插画”或“废土风格”。

#只显示最终扩写后的视频提示词，并且用一段话呈现",
);

/// Vision: describe the image as comma-separated English phrases with the
/// standard quality tags appended.
pub const VISION_PROMPT: BuiltinPrompt = BuiltinPrompt::new(
    "先理解这个图片上面的内容，然后生成描绘主体对象的[[英文]]短语，语言是english。生成规范是，记住你需要描绘我提供给你的图片细节尽可能的多，角度尽可能更加丰富，多写[逗号‘，']相连接的英文短语,切记一定需要在生成的prompt文本当中中添加下面这堆prompt，[[best quality, high resolution, 4k, high quality]]，描绘人称都用第三人称",
);

/// Translation. `{source_lang}` and `{target_lang}` are substituted before
/// the prompt is sent.
pub const TRANSLATE_PROMPT: BuiltinPrompt = BuiltinPrompt::new(
    "You are a professional translator. \
     Translate the user's text from {source_lang} to {target_lang}. \
     If the source language is \"auto\", detect it. Preserve meaning, tone, and formatting. \
     Output only the translation, with no explanations or quotation marks.",
);

/// Name of the single entry in each built-in catalog.
pub const BUILTIN_PRESET_NAME: &str = "default";

pub fn text_chat_catalog() -> PromptCatalog {
    PromptCatalog::single(BUILTIN_PRESET_NAME, TEXT_CHAT_PROMPT.as_str())
}

pub fn vision_catalog() -> PromptCatalog {
    PromptCatalog::single(BUILTIN_PRESET_NAME, VISION_PROMPT.as_str())
}

pub fn translate_catalog() -> PromptCatalog {
    PromptCatalog::single(BUILTIN_PRESET_NAME, TRANSLATE_PROMPT.as_str())
}
