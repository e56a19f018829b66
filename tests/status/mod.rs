mod long_format;
mod porcelain_format;
